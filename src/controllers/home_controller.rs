pub async fn index() -> &'static str {
    "Server is Live!"
}
