//! Cosmetic effect tools. Thin wrappers over `image::imageops`; the
//! output keeps the upload's format.

use super::resize::plain_output;
use super::{Family, Recipe, Registry};
use crate::params::Schema;
use image::{DynamicImage, Rgba, RgbaImage};

pub fn register(registry: &mut Registry) {
    registry.add(Recipe::image(
        "grayscale",
        Family::Effects,
        "Convert to grayscale",
        Schema::new(),
        |handle, _params, _ctx| Ok(plain_output(handle, handle.image().grayscale())),
    ));

    registry.add(Recipe::image(
        "invert",
        Family::Effects,
        "Invert all channels (negative)",
        Schema::new(),
        |handle, _params, _ctx| {
            let mut image = handle.image().clone();
            image.invert();
            Ok(plain_output(handle, image))
        },
    ));

    registry.add(Recipe::image(
        "blur",
        Family::Effects,
        "Gaussian blur",
        Schema::new().float("sigma", 0.1, 50.0, 2.0, "blur strength, default 2"),
        |handle, params, _ctx| {
            let sigma = params.float("sigma").unwrap_or(2.0) as f32;
            Ok(plain_output(handle, handle.image().blur(sigma)))
        },
    ));

    registry.add(Recipe::image(
        "sharpen",
        Family::Effects,
        "Unsharp-mask sharpening",
        Schema::new()
            .float("sigma", 0.1, 20.0, 1.0, "mask radius, default 1")
            .int("threshold", 0, 255, 3, "minimum brightness difference, default 3"),
        |handle, params, _ctx| {
            let sigma = params.float("sigma").unwrap_or(1.0) as f32;
            let threshold = params.int("threshold").unwrap_or(3) as i32;
            Ok(plain_output(handle, handle.image().unsharpen(sigma, threshold)))
        },
    ));

    registry.add(Recipe::image(
        "brighten",
        Family::Effects,
        "Add brightness to every pixel",
        Schema::new().int("amount", -255, 255, 20, "channel offset, default 20"),
        |handle, params, _ctx| {
            let amount = params.int("amount").unwrap_or(20) as i32;
            Ok(plain_output(handle, handle.image().brighten(amount)))
        },
    ));

    registry.add(Recipe::image(
        "contrast",
        Family::Effects,
        "Adjust contrast",
        Schema::new().float("amount", -100.0, 100.0, 10.0, "contrast delta, default 10"),
        |handle, params, _ctx| {
            let amount = params.float("amount").unwrap_or(10.0) as f32;
            Ok(plain_output(handle, handle.image().adjust_contrast(amount)))
        },
    ));

    registry.add(Recipe::image(
        "hue-rotate",
        Family::Effects,
        "Rotate hues around the color wheel",
        Schema::new().int("degrees", -360, 360, 90, "rotation in degrees, default 90"),
        |handle, params, _ctx| {
            let degrees = params.int("degrees").unwrap_or(90) as i32;
            Ok(plain_output(handle, handle.image().huerotate(degrees)))
        },
    ));

    registry.add(Recipe::image(
        "border",
        Family::Effects,
        "Surround the image with a solid border",
        Schema::new()
            .dimension("size", "border thickness, default 10px")
            .color("color", [255, 255, 255, 255], "border color, default white"),
        |handle, params, _ctx| {
            let size = params.px("size").unwrap_or(10);
            let color = params.color("color").unwrap_or([255, 255, 255, 255]);
            Ok(plain_output(handle, with_border(handle.image(), size, color)))
        },
    ));
}

fn with_border(image: &DynamicImage, size: u32, color: [u8; 4]) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let mut canvas = RgbaImage::from_pixel(w + 2 * size, h + 2 * size, Rgba(color));
    image::imageops::overlay(&mut canvas, &image.to_rgba8(), size as i64, size as i64);
    DynamicImage::ImageRgba8(canvas)
}
