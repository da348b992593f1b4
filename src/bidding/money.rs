/// 금액 파싱
/// 폼에서 들어온 문자열 금액을 소수점 2자리 고정소수점 값으로 변환한다.
use super::error::AuctionError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 금액 소수점 자리수
pub const MONEY_SCALE: u32 = 2;

/// 저장 가능한 최대 금액 (NUMERIC(9, 2) 컬럼 기준, 9999999.99)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(999_999_999, 0, 0, false, MONEY_SCALE);

/// 최대 금액 초과 여부 확인
pub fn ensure_within_limit(field: &str, value: Decimal) -> Result<(), AuctionError> {
    if value > MAX_AMOUNT {
        return Err(AuctionError::Validation(format!(
            "{} cannot exceed {}",
            field, MAX_AMOUNT
        )));
    }
    Ok(())
}

/// 필수 금액 파싱
pub fn parse_amount(field: &str, raw: &str) -> Result<Decimal, AuctionError> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed)
        .map_err(|_| AuctionError::Validation(format!("Invalid {}: {:?}", field, trimmed)))?;

    let mut value = value.normalize();
    ensure_within_limit(field, value)?;
    if value.scale() > MONEY_SCALE {
        return Err(AuctionError::Validation(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        )));
    }
    value.rescale(MONEY_SCALE);
    Ok(value)
}

/// 선택 금액 파싱 (빈 문자열은 미입력으로 취급)
pub fn parse_optional_amount(
    field: &str,
    raw: Option<&str>,
) -> Result<Option<Decimal>, AuctionError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_amount(field, value).map(Some),
    }
}
