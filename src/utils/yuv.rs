/// YUV420P ⇄ RGB 转换 (标量版, 全范围 BT.601 整数近似)
/// YUV420P <-> RGB conversion used to annotate decoded frames in place
use image::RgbImage;

/// 只读 YUV420P 平面
pub struct Yuv420pPlanes<'a> {
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub y_stride: usize,
    pub uv_stride: usize,
}

/// 可写 YUV420P 平面
pub struct Yuv420pPlanesMut<'a> {
    pub y: &'a mut [u8],
    pub u: &'a mut [u8],
    pub v: &'a mut [u8],
    pub y_stride: usize,
    pub uv_stride: usize,
}

/// 色度平面尺寸 (奇数宽高向上取整)
pub fn chroma_size(width: u32, height: u32) -> (usize, usize) {
    (width.div_ceil(2) as usize, height.div_ceil(2) as usize)
}

/// YUV420P → RgbImage
pub fn yuv420p_to_rgb(planes: &Yuv420pPlanes<'_>, width: u32, height: u32) -> RgbImage {
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let mut out_idx = 0;
    for y in 0..height as usize {
        let y_row = y * planes.y_stride;
        let uv_row = (y >> 1) * planes.uv_stride;

        for x in 0..width as usize {
            let y_val = planes.y[y_row + x] as i32;
            let u_val = planes.u[uv_row + (x >> 1)] as i32 - 128;
            let v_val = planes.v[uv_row + (x >> 1)] as i32 - 128;

            buffer[out_idx] = (y_val + ((v_val * 179) >> 7)).clamp(0, 255) as u8;
            buffer[out_idx + 1] =
                (y_val - ((u_val * 44) >> 7) - ((v_val * 91) >> 7)).clamp(0, 255) as u8;
            buffer[out_idx + 2] = (y_val + ((u_val * 227) >> 7)).clamp(0, 255) as u8;
            out_idx += 3;
        }
    }
    // 尺寸与缓冲区长度一致, from_raw 不会失败
    RgbImage::from_raw(width, height, buffer).unwrap_or_else(|| RgbImage::new(width, height))
}

/// RgbImage → YUV420P, 色度取 2x2 块平均
pub fn rgb_to_yuv420p(image: &RgbImage, planes: &mut Yuv420pPlanesMut<'_>) {
    let (width, height) = image.dimensions();
    let (cw, ch) = chroma_size(width, height);

    for y in 0..height {
        let y_row = y as usize * planes.y_stride;
        for x in 0..width {
            let [r, g, b] = image.get_pixel(x, y).0;
            let (r, g, b) = (r as i32, g as i32, b as i32);
            planes.y[y_row + x as usize] = ((77 * r + 150 * g + 29 * b) >> 8).clamp(0, 255) as u8;
        }
    }

    for cy in 0..ch {
        let uv_row = cy * planes.uv_stride;
        for cx in 0..cw {
            let (mut r, mut g, mut b, mut n) = (0i32, 0i32, 0i32, 0i32);
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let (px, py) = ((cx * 2 + dx) as u32, (cy * 2 + dy) as u32);
                if px < width && py < height {
                    let [pr, pg, pb] = image.get_pixel(px, py).0;
                    r += pr as i32;
                    g += pg as i32;
                    b += pb as i32;
                    n += 1;
                }
            }
            let (r, g, b) = (r / n, g / n, b / n);
            planes.u[uv_row + cx] = (((-43 * r - 85 * g + 128 * b) >> 8) + 128).clamp(0, 255) as u8;
            planes.v[uv_row + cx] = (((128 * r - 107 * g - 21 * b) >> 8) + 128).clamp(0, 255) as u8;
        }
    }
}
