use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ez_ffmpeg::{FfmpegContext, Input, Output};
use image::{Rgb, RgbImage};
use ndarray::{Array, IxDyn};

use yolov8_distance::detection::{DetectionLog, EdgeDistances, FrameRecord};
use yolov8_distance::models::Model;
use yolov8_distance::renderer::Annotator;
use yolov8_distance::input::VideoInfo;
use yolov8_distance::{run, run_with_model, Args, Bbox, DrawStyle, FrameProcessor, RunConfig};

/// 按帧返回预设候选框的模型
struct ScriptedModel {
    frames: VecDeque<Vec<Bbox>>,
    names: Vec<String>,
}

impl ScriptedModel {
    fn new(frames: Vec<Vec<Bbox>>, names: &[&str]) -> Self {
        Self {
            frames: frames.into(),
            names: names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Model for ScriptedModel {
    fn preprocess(&mut self, _image: &RgbImage) -> Result<Array<f32, IxDyn>> {
        Ok(Array::zeros(IxDyn(&[1, 3, 1, 1])))
    }

    fn run(&mut self, xs: Array<f32, IxDyn>, _profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        Ok(vec![xs])
    }

    fn postprocess(&self, _xs: Vec<Array<f32, IxDyn>>, _size: (u32, u32)) -> Result<Vec<Bbox>> {
        Ok(Vec::new())
    }

    fn forward(&mut self, _image: &RgbImage) -> Result<Vec<Bbox>> {
        Ok(self.frames.pop_front().unwrap_or_default())
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn conf(&self) -> f32 {
        0.25
    }

    fn summary(&self) {}
}

fn read_records(path: &PathBuf) -> Vec<FrameRecord> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn processor(model: ScriptedModel, log_path: &PathBuf) -> FrameProcessor<ScriptedModel> {
    let log = DetectionLog::create(log_path).unwrap();
    FrameProcessor::new(model, Annotator::new(DrawStyle::default(), None), log)
}

#[test]
fn two_frame_video_logs_reference_distances() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("detections.jsonl");

    let model = ScriptedModel::new(
        vec![
            vec![],
            vec![
                Bbox::from_xyxy(0., 0., 20., 20., 1, 0.6),
                Bbox::from_xyxy(10., 10., 50., 50., 0, 0.9),
                Bbox::from_xyxy(60., 60., 90., 90., 1, 0.2),
            ],
        ],
        &["drone", "bird"],
    );
    let mut p = processor(model, &log_path);

    let blank = RgbImage::from_pixel(100, 100, Rgb([40, 40, 40]));
    let mut frame0 = blank.clone();
    let mut frame1 = blank.clone();
    p.process(&mut frame0).unwrap();
    p.process(&mut frame1).unwrap();
    assert_eq!(p.frames(), 2);
    assert_eq!(p.detected(), 1);

    // 无检测帧不改动, 有检测帧被标注
    assert_eq!(frame0, blank);
    assert_ne!(frame1, blank);

    let records = read_records(&log_path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].frame_index, 0);
    assert!(records[0].detections.is_empty());

    assert_eq!(records[1].frame_index, 1);
    assert_eq!(records[1].detections.len(), 1);
    let det = &records[1].detections[0];
    assert_eq!(det.frame_index, 1);
    assert_eq!(det.class_id, 0);
    assert_eq!(det.class_name, "drone");
    assert!((det.confidence - 0.9).abs() < 1e-6);
    assert_eq!(det.bbox_xyxy, [10., 10., 50., 50.]);
    assert_eq!(
        det.distances_px,
        EdgeDistances {
            left: 10,
            right: 50,
            top: 10,
            bottom: 50
        }
    );
}

#[test]
fn one_record_per_frame_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("detections.jsonl");

    let (w, h) = (320u32, 240u32);
    let frames: Vec<Vec<Bbox>> = (0..7)
        .map(|i| match i % 3 {
            0 => vec![],
            1 => vec![Bbox::from_xyxy(12.7, 30.2, 200.9, 180.5, 2, 0.3 + i as f32 * 0.05)],
            _ => vec![Bbox::from_xyxy(300., 200., 330., 250., 0, 0.1)],
        })
        .collect();
    let mut p = processor(ScriptedModel::new(frames, &[]), &log_path).with_progress(Some(7), 3);

    for _ in 0..7 {
        let mut frame = RgbImage::new(w, h);
        p.process(&mut frame).unwrap();
    }

    let records = read_records(&log_path);
    assert_eq!(records.len(), 7);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.frame_index, i as u64);
        assert!(record.detections.len() <= 1);
        if let Some(det) = record.best() {
            assert!(det.confidence >= 0.25);
            assert_eq!(det.class_name, "2");
            let [x1, y1, x2, y2] = det.pixel_box();
            let d = det.distances_px;
            assert_eq!(d.left + (x2 - x1) + d.right, w as i32);
            assert_eq!(d.top + (y2 - y1) + d.bottom, h as i32);
        }
    }
    // 阈值以下的候选框不产生检测
    assert!(records[2].detections.is_empty());
    assert!(records[5].detections.is_empty());
}

#[test]
fn run_fails_fast_on_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RunConfig::from(<Args as clap::Parser>::parse_from(["distance"]));
    config.input = dir.path().join("missing.mp4");
    config.detections = dir.path().join("detections.jsonl");

    let err = run(config).unwrap_err();
    assert!(err.to_string().contains("Input video not found"));
    // 前置检查失败时不应创建日志
    assert!(!dir.path().join("detections.jsonl").exists());
}

/// lavfi testsrc 生成一段 100x100 / 25fps 的短视频
fn make_clip(path: &Path, frames: i64) {
    let output = Output::from(path.to_string_lossy().to_string())
        .set_video_codec("mpeg4")
        .set_max_video_frames(frames);
    FfmpegContext::builder()
        .input(Input::from("testsrc=size=100x100:rate=25").set_format("lavfi"))
        .output(output)
        .build()
        .unwrap()
        .start()
        .unwrap()
        .wait()
        .unwrap();
}

#[test]
fn video_round_trip_keeps_frame_count_and_rate() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("clip.mp4");
    make_clip(&input, 8);
    let input_info = VideoInfo::probe(&input).unwrap();
    let input_frames = input_info.frames.unwrap();
    assert_eq!(input_frames, 8);

    let mut config = RunConfig::from(<Args as clap::Parser>::parse_from(["distance"]));
    config.input = input;
    config.output = dir.path().join("annotated.mp4");
    config.detections = dir.path().join("detections.jsonl");
    config.font = dir.path().join("missing.ttf");

    let frames: Vec<Vec<Bbox>> = (0..input_frames)
        .map(|i| {
            if i % 3 == 1 {
                vec![Bbox::from_xyxy(10., 10., 50., 50., 0, 0.8)]
            } else {
                vec![]
            }
        })
        .collect();
    let summary = run_with_model(config.clone(), ScriptedModel::new(frames, &["drone"])).unwrap();
    assert_eq!(summary.frames, input_frames);
    assert_eq!(summary.detected, 3);

    let records = read_records(&config.detections);
    assert_eq!(records.len() as u64, input_frames);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.frame_index, i as u64);
        assert_eq!(record.detections.len(), usize::from(i % 3 == 1));
    }
    assert_eq!(
        records[1].best().unwrap().distances_px,
        EdgeDistances {
            left: 10,
            right: 50,
            top: 10,
            bottom: 50
        }
    );

    let output_info = VideoInfo::probe(&config.output).unwrap();
    assert_eq!((output_info.width, output_info.height), (100, 100));
    assert_eq!(output_info.frames, Some(input_frames));
    let (fps_in, fps_out) = (input_info.fps.unwrap(), output_info.fps.unwrap());
    assert!((fps_in - fps_out).abs() < 1e-2, "{} vs {}", fps_in, fps_out);
}
