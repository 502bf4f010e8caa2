use anyhow::Context;
use axum::http::{self, HeaderValue, Method};
use dotenvy::dotenv;
use env_logger::Builder;
use log::LevelFilter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use werewolf_server::{app, models::config::GameConfig};

// ログ設定
fn init_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .filter_module("werewolf_server", LevelFilter::Debug)
        .filter_module("tower_http", LevelFilter::Debug)
        .filter_module("axum", LevelFilter::Debug)
        .format_timestamp(Some(env_logger::TimestampPrecision::Millis))
        .format_target(true);
    // RUST_LOG が設定されていれば優先する
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 環境変数をロード
    if let Err(e) = dotenv() {
        eprintln!("Warning: .envファイルの読み込みに失敗しました: {}", e);
    }

    init_logger(); // ロガーの初期化

    let config = GameConfig::from_env();
    log::info!("Starting with config: {:?}", config);

    // CORSレイヤーの設定
    let origin = config
        .allowed_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid allowed origin: {}", config.allowed_origin))?;
    let cors = CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([http::header::CONTENT_TYPE]);

    let bind_addr = config.bind_addr.clone();

    // ルーティングの設定
    let app = app::create_app(config).layer(cors).layer(
        TraceLayer::new_for_http() // HTTPトレースログを有効化
            .make_span_with(|request: &http::Request<_>| {
                tracing::info_span!(
                    "HTTP request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
    );

    // サーバーの起動
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("サーバーを起動しました: http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
