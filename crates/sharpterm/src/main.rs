//! SharpScript MUD 客戶端（終端機版）

mod app;
mod console;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), app::AppError> {
    // 日誌寫到 stderr，stdout 留給 MUD 文字
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = app::Args::parse();
    app::run(args).await
}
