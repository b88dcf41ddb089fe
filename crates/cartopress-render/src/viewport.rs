use cartopress_core::geometry::{BBox, Point};

/// Maps data coordinates onto the device canvas. The fit is margin-free:
/// the extent's corners land exactly on the canvas corners, and Y flips
/// because cairo device space grows downward while the data grows upward.
///
/// X and Y scale independently; the canvas height is normally derived from
/// the data aspect upstream, so the scales only diverge when the user
/// forced explicit dimensions.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    extent: BBox,
    device_width: f64,
    device_height: f64,
}

impl Viewport {
    pub fn fit(extent: BBox, device_width: f64, device_height: f64) -> Self {
        Self {
            extent,
            device_width,
            device_height,
        }
    }

    pub fn extent(&self) -> &BBox {
        &self.extent
    }

    fn scale_x(&self) -> f64 {
        let w = self.extent.width();
        if w > 0.0 {
            self.device_width / w
        } else {
            1.0
        }
    }

    fn scale_y(&self) -> f64 {
        let h = self.extent.height();
        if h > 0.0 {
            self.device_height / h
        } else {
            1.0
        }
    }

    /// Convert a data point to device coordinates.
    pub fn to_device(&self, p: &Point) -> (f64, f64) {
        (
            (p.x - self.extent.min.x) * self.scale_x(),
            self.device_height - (p.y - self.extent.min.y) * self.scale_y(),
        )
    }

    /// Convert a device position back into data coordinates.
    pub fn to_data(&self, x: f64, y: f64) -> Point {
        Point::new(
            self.extent.min.x + x / self.scale_x(),
            self.extent.min.y + (self.device_height - y) / self.scale_y(),
        )
    }
}
