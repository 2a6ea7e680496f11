// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNX Runtime 推理后端
// 负责: 会话加载、模型元数据(类别名)、前向推理

use anyhow::{Context, Result};
use ndarray::{Array, IxDyn};
use ort::session::Session;
use ort::value::Tensor;
use regex::Regex;
use std::path::PathBuf;

/// ultralytics 导出的ONNX输入/输出名
const INPUT_NAME: &str = "images";
const OUTPUT_NAME: &str = "output0";

/// 后端配置
#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub image_size: (u32, u32), // (height, width)
}

pub struct OrtBackend {
    session: Session,
    names: Option<Vec<String>>,
    height: u32,
    width: u32,
}

impl OrtBackend {
    pub fn build(args: OrtConfig) -> Result<Self> {
        let session = Session::builder()
            .context("创建ORT会话构建器失败")?
            .commit_from_file(&args.f)
            .with_context(|| format!("加载ONNX模型失败: {}", args.f.display()))?;

        // ultralytics 将类别名写入自定义元数据 `names`
        let names = session
            .metadata()
            .ok()
            .and_then(|m| m.custom("names").ok().flatten())
            .map(|s| parse_names(&s))
            .filter(|names| !names.is_empty());

        let (height, width) = args.image_size;
        Ok(Self {
            session,
            names,
            height,
            width,
        })
    }

    /// 前向推理, 返回 output0
    pub fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        let t = std::time::Instant::now();
        let shape: [usize; 4] = xs.shape().try_into().context("输入张量必须为NCHW四维")?;
        let (data, _) = xs.into_raw_vec_and_offset();
        let input = Tensor::from_array((shape, data.into_boxed_slice()))
            .context("创建输入张量失败")?;

        let outputs = self
            .session
            .run(ort::inputs![INPUT_NAME => input])
            .context("ONNX推理失败")?;
        if profile {
            log::debug!("[ORT run]: {:?}", t.elapsed());
        }

        let (shape, data) = outputs[OUTPUT_NAME]
            .try_extract_tensor::<f32>()
            .context("提取输出张量失败")?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let y = Array::from_shape_vec(IxDyn(&dims), data.to_vec())?;
        Ok(vec![y])
    }

    pub fn names(&self) -> Option<Vec<String>> {
        self.names.clone()
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}

/// 解析 `{0: 'person', 1: 'car'}` 形式的类别表
///
/// 按id排序, 中间缺失的id补为id字符串
pub fn parse_names(raw: &str) -> Vec<String> {
    let re = match Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let mut pairs: Vec<(usize, String)> = re
        .captures_iter(raw)
        .filter_map(|c| Some((c[1].parse::<usize>().ok()?, c[2].to_string())))
        .collect();
    pairs.sort_by_key(|(id, _)| *id);

    let len = pairs.last().map(|(id, _)| id + 1).unwrap_or(0);
    let mut names: Vec<String> = (0..len).map(|i| i.to_string()).collect();
    for (id, name) in pairs {
        names[id] = name;
    }
    names
}
