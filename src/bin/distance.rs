/// 视频逐帧检测 + 边距标注
///
/// 读取视频 → YOLOv8检测 → 取置信度最高的目标 → 绘制检测框与四向边距
/// → 输出标注视频 + JSONL检测记录
///
/// 直接运行: cargo run --bin distance --release
use clap::Parser;
use yolov8_distance::{run, Args, RunConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = RunConfig::from(args);

    if let Err(e) = run(config) {
        log::error!("❌ {:#}", e);
        return Err(e);
    }
    Ok(())
}
