/// 输入视频探测
/// Container probe: resolution, frame rate and frame count of the first video stream
use anyhow::{anyhow, bail, Result};
use ez_ffmpeg::stream_info::{find_video_stream_info, StreamInfo};
use std::path::Path;

/// 视频流基本信息
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    /// None: 容器未给出有效帧率
    pub fps: Option<f64>,
    /// None: 容器未给出帧数
    pub frames: Option<u64>,
}

impl VideoInfo {
    pub fn probe(path: &Path) -> Result<Self> {
        let url = path.to_string_lossy().to_string();
        let info = find_video_stream_info(url)
            .map_err(|e| anyhow!("无法打开视频 {}: {}", path.display(), e))?;

        match info {
            Some(StreamInfo::Video {
                width,
                height,
                fps,
                nb_frames,
                ..
            }) => Ok(Self::from_stream(
                width as i64,
                height as i64,
                fps as f64,
                nb_frames as i64,
            )),
            _ => bail!("{} 中没有视频流", path.display()),
        }
    }

    /// 容器给出的原始数值 → 有效信息 (0/负数/非有限值视为未知)
    pub fn from_stream(width: i64, height: i64, fps: f64, nb_frames: i64) -> Self {
        Self {
            width: width.max(0) as u32,
            height: height.max(0) as u32,
            fps: (fps.is_finite() && fps > 0.0).then_some(fps),
            frames: (nb_frames > 0).then_some(nb_frames as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_stream_valid() {
        let info = VideoInfo::from_stream(1920, 1080, 29.97, 900);
        assert_eq!(info.width, 1920);
        assert_eq!(info.fps, Some(29.97));
        assert_eq!(info.frames, Some(900));
    }

    #[test]
    fn test_from_stream_unknown_rate_and_count() {
        let info = VideoInfo::from_stream(640, 480, 0.0, 0);
        assert_eq!(info.fps, None);
        assert_eq!(info.frames, None);
        assert_eq!(VideoInfo::from_stream(640, 480, f64::NAN, -1).fps, None);
    }

    #[test]
    fn test_probe_missing_file_fails() {
        assert!(VideoInfo::probe(Path::new("/nonexistent/input.mp4")).is_err());
    }
}
