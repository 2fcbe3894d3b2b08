//! Pixel format handling
//!
//! The capture device delivers packed 4:2:2 YUYV; everything that needs RGB
//! (the local renderer, client-side decoders) goes through [`yuyv`].

pub mod yuyv;

pub use yuyv::{yuyv_to_rgb, yuyv_to_rgb_into, RGB_BYTES_PER_PIXEL, YUYV_BYTES_PER_PIXEL};
