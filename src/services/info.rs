/// Read the clinic's informational text. Read fresh on every request so the
/// file can be edited without restarting the service.
pub async fn load_info(path: &str) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::error!(error = %e, path, "failed to read info content");
            None
        }
    }
}
