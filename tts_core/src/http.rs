use reqwest::Response;

/// Turn a non-2xx response into an error carrying the status and body.
pub(crate) async fn ensure_success(response: Response, api: &str) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    anyhow::bail!("{api} API error: {status} - {body}")
}
