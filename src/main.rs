use clap::Parser;
use tracing::info;

use geoipd::config::{Cli, Command, StaticConfig, get_config, init_config, update_config};
use geoipd::errors::GeoError;
use geoipd::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::GenerateConfig) = cli.command {
        print!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    // .env 中的 GEOIPD__* 变量与真实环境变量同等对待
    dotenvy::dotenv().ok();
    init_config(cli.config.as_deref());

    // 命令行参数优先于配置文件和环境变量
    if cli.listen.is_some() || cli.port.is_some() || cli.cors_origin.is_some() {
        update_config(|config| {
            if let Some(host) = cli.listen.clone() {
                config.server.host = host;
            }
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(origin) = cli.cors_origin.clone() {
                config.cors.origin = origin;
            }
        });
    }

    let config = get_config();
    let guard = init_logging(&config.logging)?;
    info!("geoipd {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = geoipd::runtime::modes::run_server().await {
        // 领域错误以彩色格式输出，其余保留完整 context 链
        match e.downcast_ref::<GeoError>() {
            Some(geo) => eprintln!("{}\n  {:#}", geo.format_colored(), e),
            None => eprintln!("[ERROR] {:#}", e),
        }
        // 退出前刷新非阻塞日志
        drop(guard);
        std::process::exit(1);
    }

    drop(guard);
    Ok(())
}
