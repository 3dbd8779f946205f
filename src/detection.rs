use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::category::Category;

/// Output of the external detector, before any class mapping.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "c")]
    pub label: String,
    #[serde(rename = "p")]
    pub confidence: f32,
}

/// Contains (x,y) of the center and (width,height) of bbox
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub category: Category,
}

impl Detection {
    pub fn new(bbox: BBox<Ltrb>, category: Category, confidence: f32) -> Self {
        let c = bbox.center();

        Self {
            x: c.x,
            y: c.y,
            w: bbox.width(),
            h: bbox.height(),
            confidence,
            category,
        }
    }

    /// Point-sized detection, handy when only the centroid is known.
    pub fn at(x: f32, y: f32, category: Category) -> Self {
        Self {
            x,
            y,
            w: 0.0,
            h: 0.0,
            confidence: 1.0,
            category,
        }
    }

    #[inline(always)]
    pub fn centroid(&self) -> na::Point2<f32> {
        na::Point2::new(self.x, self.y)
    }

    #[inline(always)]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    #[inline(always)]
    pub fn bbox(&self) -> BBox<Ltrb> {
        BBox::ltrb(self.xmin(), self.ymin(), self.xmax(), self.ymax())
    }

    #[inline(always)]
    pub fn xmax(&self) -> f32 {
        self.x + self.w / 2.
    }

    #[inline(always)]
    pub fn ymax(&self) -> f32 {
        self.y + self.h / 2.
    }

    #[inline(always)]
    pub fn xmin(&self) -> f32 {
        self.x - self.w / 2.
    }

    #[inline(always)]
    pub fn ymin(&self) -> f32 {
        self.y - self.h / 2.
    }
}
