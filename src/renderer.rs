/// 标注渲染模块
/// Draws the best detection box and its four edge-distance annotations onto a frame
use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_antialiased_line_segment_mut, draw_filled_rect_mut, draw_hollow_rect_mut,
    draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::pixelops::interpolate;
use imageproc::rect::Rect;
use std::path::Path;

use crate::config::DrawStyle;
use crate::detection::{Detection, EdgeDistances};

/// 边距方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Left, Side::Right, Side::Top, Side::Bottom];

    pub fn name(&self) -> &str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Top => "top",
            Side::Bottom => "bottom",
        }
    }
}

/// 单侧边距的绘制几何
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceGeometry {
    pub distance: i32,
    pub start: (i32, i32),
    pub end: (i32, i32),
    /// 文字基线左端
    pub text_origin: (i32, i32),
}

/// 向下取整除法 (除数为正)
fn floor_div(a: i32, b: i32) -> i32 {
    a.div_euclid(b)
}

/// 计算某一侧的边距线段与标签位置
///
/// 线段从画面边缘连到框边, 位于框的水平/垂直中线上
pub fn distance_geometry(
    side: Side,
    bbox: [i32; 4],
    frame_w: i32,
    frame_h: i32,
) -> DistanceGeometry {
    let [x1, y1, x2, y2] = bbox;
    let cx = x1 + floor_div(x2 - x1, 2);
    let cy = y1 + floor_div(y2 - y1, 2);
    let d = EdgeDistances::measure(bbox, frame_w, frame_h);

    match side {
        Side::Left => DistanceGeometry {
            distance: d.left,
            start: (0, cy),
            end: (x1, cy),
            text_origin: (floor_div(x1, 4), cy - 10),
        },
        Side::Right => DistanceGeometry {
            distance: d.right,
            start: (x2, cy),
            end: (frame_w - 1, cy),
            text_origin: (frame_w - floor_div(d.right, 2) - 20, cy - 10),
        },
        Side::Top => DistanceGeometry {
            distance: d.top,
            start: (cx, 0),
            end: (cx, y1),
            text_origin: (cx - 15, floor_div(y1, 2)),
        },
        Side::Bottom => DistanceGeometry {
            distance: d.bottom,
            start: (cx, y2),
            end: (cx, frame_h - 1),
            text_origin: (cx - 15, frame_h - floor_div(d.bottom, 2)),
        },
    }
}

/// 帧标注器: 检测框 + 四向边距线 + 距离标签
pub struct Annotator {
    style: DrawStyle,
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new(style: DrawStyle, font: Option<FontVec>) -> Self {
        Self { style, font }
    }

    /// 加载标签字体, 失败时返回None (标签只画底色)
    pub fn load_font(path: &Path) -> Option<FontVec> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("⚠️  字体 {} 读取失败: {}, 距离标签将不显示数字", path.display(), e);
                return None;
            }
        };
        match FontVec::try_from_vec(data) {
            Ok(font) => {
                log::info!("✅ 字体加载成功: {}", path.display());
                Some(font)
            }
            Err(e) => {
                log::warn!("⚠️  字体 {} 解析失败: {}", path.display(), e);
                None
            }
        }
    }

    /// 绘制检测框与四个边距标注, 返回各侧距离
    pub fn draw_detection(&self, frame: &mut RgbImage, detection: &Detection) -> EdgeDistances {
        let bbox = detection.pixel_box();
        let (w, h) = (frame.width() as i32, frame.height() as i32);

        self.draw_box(frame, bbox);

        let mut distances = EdgeDistances::default();
        for side in Side::ALL {
            let d = self.draw_distance(frame, side, bbox, w, h);
            match side {
                Side::Left => distances.left = d,
                Side::Right => distances.right = d,
                Side::Top => distances.top = d,
                Side::Bottom => distances.bottom = d,
            }
        }
        distances
    }

    /// 主检测框, 按线宽向内外扩展
    fn draw_box(&self, frame: &mut RgbImage, bbox: [i32; 4]) {
        let [x1, y1, x2, y2] = bbox;
        let color = Rgb(self.style.box_color);
        let t = self.style.box_thickness.max(1) as i32;
        for i in 0..t {
            let o = i - t / 2;
            let w = x2 - x1 + 1 - 2 * o;
            let h = y2 - y1 + 1 - 2 * o;
            if w <= 0 || h <= 0 {
                continue;
            }
            let rect = Rect::at(x1 + o, y1 + o).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(frame, rect, color);
        }
    }

    /// 单侧边距线 + 标签
    pub fn draw_distance(
        &self,
        frame: &mut RgbImage,
        side: Side,
        bbox: [i32; 4],
        frame_w: i32,
        frame_h: i32,
    ) -> i32 {
        let geo = distance_geometry(side, bbox, frame_w, frame_h);
        log::trace!("{}: {}px", side.name(), geo.distance);
        self.draw_line(frame, geo.start, geo.end);
        self.draw_label(frame, &geo.distance.to_string(), geo.text_origin);
        geo.distance
    }

    /// 水平/垂直线段, 先裁剪到画面内
    fn draw_line(&self, frame: &mut RgbImage, start: (i32, i32), end: (i32, i32)) {
        let (w, h) = (frame.width() as i32, frame.height() as i32);
        if w == 0 || h == 0 {
            return;
        }
        let clip = |(x, y): (i32, i32)| (x.clamp(0, w - 1), y.clamp(0, h - 1));
        // 整条线都在画面外时不画
        if (start.1 == end.1 && !(0..h).contains(&start.1))
            || (start.0 == end.0 && !(0..w).contains(&start.0))
        {
            return;
        }
        let (start, end) = (clip(start), clip(end));

        let color = Rgb(self.style.box_color);
        if start == end {
            frame.put_pixel(start.0 as u32, start.1 as u32, color);
            return;
        }
        if self.style.antialias {
            draw_antialiased_line_segment_mut(frame, start, end, color, interpolate);
        } else {
            draw_line_segment_mut(
                frame,
                (start.0 as f32, start.1 as f32),
                (end.0 as f32, end.1 as f32),
                color,
            );
        }
    }

    /// 文字像素尺寸 (宽, 高); 无字体时按等宽估算
    pub fn text_size(&self, text: &str) -> (i32, i32) {
        let px = self.style.font_px;
        match &self.font {
            Some(font) => {
                let (tw, th) = text_size(px, font, text);
                (tw as i32, th as i32)
            }
            None => (
                (px * 0.6 * text.chars().count() as f32).ceil() as i32,
                (px * 0.7).ceil() as i32,
            ),
        }
    }

    /// 红底白字距离标签, origin 为文字基线左端
    fn draw_label(&self, frame: &mut RgbImage, text: &str, origin: (i32, i32)) {
        let (tw, th) = self.text_size(text);
        let (ox, oy) = origin;
        // 两角均包含在内: (ox - 2, oy - th - 2) ..= (ox + tw + 2, oy + 2)
        let rect = Rect::at(ox - 2, oy - th - 2)
            .of_size((tw + 5).max(1) as u32, (th + 5).max(1) as u32);
        draw_filled_rect_mut(frame, rect, Rgb(self.style.label_color));

        if let Some(font) = &self.font {
            draw_text_mut(
                frame,
                Rgb(self.style.text_color),
                ox,
                oy - th,
                self.style.font_px,
                font,
                text,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const RED: Rgb<u8> = Rgb([255, 0, 0]);

    fn detection(bbox: [f32; 4], w: i32, h: i32) -> Detection {
        let b = [bbox[0] as i32, bbox[1] as i32, bbox[2] as i32, bbox[3] as i32];
        Detection {
            frame_index: 0,
            class_id: 0,
            class_name: "0".into(),
            confidence: 0.9,
            bbox_xyxy: bbox,
            distances_px: EdgeDistances::measure(b, w, h),
        }
    }

    #[test]
    fn test_geometry_reference_box() {
        let bbox = [10, 10, 50, 50];
        let left = distance_geometry(Side::Left, bbox, 100, 100);
        assert_eq!(left.distance, 10);
        assert_eq!((left.start, left.end), ((0, 30), (10, 30)));
        assert_eq!(left.text_origin, (2, 20));

        let right = distance_geometry(Side::Right, bbox, 100, 100);
        assert_eq!(right.distance, 50);
        assert_eq!((right.start, right.end), ((50, 30), (99, 30)));
        assert_eq!(right.text_origin, (55, 20));

        let top = distance_geometry(Side::Top, bbox, 100, 100);
        assert_eq!(top.distance, 10);
        assert_eq!((top.start, top.end), ((30, 0), (30, 10)));
        assert_eq!(top.text_origin, (15, 5));

        let bottom = distance_geometry(Side::Bottom, bbox, 100, 100);
        assert_eq!(bottom.distance, 50);
        assert_eq!((bottom.start, bottom.end), ((30, 50), (30, 99)));
        assert_eq!(bottom.text_origin, (15, 75));
    }

    #[test]
    fn test_geometry_negative_distance_floors() {
        // 框越过右边缘: right = -3, -3 // 2 = -2
        let right = distance_geometry(Side::Right, [10, 10, 103, 50], 100, 100);
        assert_eq!(right.distance, -3);
        assert_eq!(right.text_origin, (100 + 2 - 20, 20));
    }

    #[test]
    fn test_draw_detection_paints_box_and_lines() {
        let mut frame = RgbImage::new(100, 100);
        let annotator = Annotator::new(DrawStyle::default(), None);
        let det = detection([10., 10., 50., 50.], 100, 100);
        let distances = annotator.draw_detection(&mut frame, &det);

        assert_eq!(distances, det.distances_px);
        // 框角 + 框边中点
        assert_eq!(*frame.get_pixel(50, 50), GREEN);
        assert_eq!(*frame.get_pixel(50, 40), GREEN);
        // 左侧边距线 (标签在线上方)
        assert_eq!(*frame.get_pixel(5, 30), GREEN);
        // 底部标签底色
        assert_eq!(*frame.get_pixel(16, 72), RED);
    }

    #[test]
    fn test_draw_box_touching_edges_does_not_panic() {
        let mut frame = RgbImage::new(64, 48);
        let annotator = Annotator::new(DrawStyle::default(), None);
        let det = detection([0., 0., 64., 48.], 64, 48);
        let d = annotator.draw_detection(&mut frame, &det);
        assert_eq!(d, EdgeDistances { left: 0, right: 0, top: 0, bottom: 0 });

        let det = detection([-5., 40., 70., 60.], 64, 48);
        annotator.draw_detection(&mut frame, &det);
    }

    #[test]
    fn test_label_box_corners_inclusive() {
        let mut frame = RgbImage::new(100, 100);
        let annotator = Annotator::new(DrawStyle::default(), None);
        let det = detection([10., 10., 50., 50.], 100, 100);
        annotator.draw_detection(&mut frame, &det);

        // 底部标签 "50": 原点 (15, 75), 文字 15x9
        assert_eq!(*frame.get_pixel(13, 64), RED);
        assert_eq!(*frame.get_pixel(32, 77), RED);
        assert_eq!(*frame.get_pixel(33, 77), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(32, 78), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_text_size_without_font() {
        let annotator = Annotator::new(DrawStyle::default(), None);
        let (tw, th) = annotator.text_size("50");
        assert_eq!((tw, th), (15, 9));
    }
}
