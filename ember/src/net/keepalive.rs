//! Self-ping: free-tier hosts spin idle processes down, so when a public
//! URL is configured the server fetches itself on a slow clock.

use ember_config::CONFIG;

pub async fn run(url: String) {
    let client = match reqwest::Client::builder().build() {
        Ok(client) => client,
        Err(err) => {
            log::error!("self-ping disabled, client build failed: {err}");
            return;
        }
    };
    let mut ticker = tokio::time::interval(CONFIG.self_ping_interval);
    // The first tick fires immediately; skip it so boot stays quiet.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match client.get(&url).send().await {
            Ok(response) => log::debug!("self-ping {} -> {}", url, response.status()),
            Err(err) => log::warn!("self-ping failed: {err}"),
        }
    }
}
