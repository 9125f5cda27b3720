pub async fn greeting() -> &'static str {
    "Welcome to bluelagoon, the continuous limit order exchange."
}
