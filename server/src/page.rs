use axum::response::Html;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Landing page. The room code travels in the `room` query parameter.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
