/// 화면 렌더링
/// 템플릿 이름과 컨텍스트를 받아 응답 문서를 만든다.
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

/// 렌더링 결과 문서
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub template: String,
    pub body: Value,
}

impl IntoResponse for Document {
    fn into_response(self) -> Response {
        Json(self.body).into_response()
    }
}

/// 렌더러 트레이트
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: Value) -> Document;
}

/// JSON 렌더러
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: Value) -> Document {
        Document {
            template: template.to_string(),
            body: json!({
                "template": template,
                "context": context,
            }),
        }
    }
}
