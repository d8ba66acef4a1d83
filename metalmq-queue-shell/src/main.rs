mod config;
mod topology;

use anyhow::Result;
use env_logger::fmt::style::{AnsiColor, Color, RgbColor, Style};
use env_logger::Builder;
use log::info;
use std::io::Write;

fn setup_logger() {
    let mut builder = Builder::from_default_env();

    builder
        .format_timestamp_millis()
        .format(|buf, record| {
            let color: Color = match record.level() {
                log::Level::Error => AnsiColor::Red.into(),
                log::Level::Warn => AnsiColor::Yellow.into(),
                log::Level::Info => AnsiColor::Green.into(),
                log::Level::Debug => RgbColor(192, 192, 192).into(),
                log::Level::Trace => RgbColor(96, 96, 96).into(),
            };
            let lvl = Style::new().bold().fg_color(Some(color));

            writeln!(
                buf,
                "{} - [{lvl}{:5}{lvl:#}] {}:{} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .init();
}

#[tokio::main(flavor = "current_thread")]
pub async fn main() -> Result<()> {
    setup_logger();

    let cli_config = config::cli();

    let config = config::parse_config(&cli_config.config_file_path)?;

    let topology = topology::build(&config, cli_config.open_late)?;

    for queue in &topology.queues {
        queue.declared().await?;

        info!(
            "Queue {} {:?}, bindings: {}, consumer: {:?}",
            queue.name(),
            queue.state(),
            queue.bindings().len(),
            queue.consumer()
        );
    }

    for method in topology.channel.issued() {
        info!("{:08X} {:?}", method.class_method(), method);
    }

    Ok(())
}
