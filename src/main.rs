mod app;
mod capture;
mod commands;
mod config;
mod logging;
mod recording;
mod studio;
mod ui;
mod visualizer;

// cpal streams are not Send, so the studio runs on a single-threaded runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
