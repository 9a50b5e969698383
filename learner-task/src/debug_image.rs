use crate::common::*;
use learner_data::RasterSource;

/// Outline every labeled cell of the raster in its class color.
///
/// Each outline is `line_width` pixels wide and lies inside its cell, so
/// that the outlines of neighboring cells do not overlap.
pub fn draw_debug_predict_image(
    raster_source: &dyn RasterSource,
    labels: &ClassificationLabels,
    class_config: &ClassConfig,
    line_width: usize,
) -> Result<RgbImage> {
    let mut image = to_rgb_image(&raster_source.get_image_array()?)?;
    let extent = PixelBox::from_hw(image.height() as usize, image.width() as usize);

    for labeled in labels.iter() {
        let color = Rgb(class_config.color_rgb(labeled.class_id)?);
        let cell = &labeled.cell;
        let inner = cell.make_eroded(line_width);
        let visible = match cell.intersection(&extent) {
            Some(visible) => visible,
            None => continue,
        };

        for y in visible.ymin()..visible.ymax() {
            for x in visible.xmin()..visible.xmax() {
                let in_inner =
                    inner.ymin() <= y && y < inner.ymax() && inner.xmin() <= x && x < inner.xmax();
                if !in_inner {
                    image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
    Ok(image)
}

/// The first three channels of the array, or its only channel repeated.
pub fn to_rgb_image(array: &Array3<u8>) -> Result<RgbImage> {
    let (height, width, channels) = array.dim();
    let channel_map = match channels {
        0 => bail!("cannot render an image without channels"),
        1 | 2 => [0, 0, 0],
        _ => [0, 1, 2],
    };
    let image = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let (y, x) = (y as usize, x as usize);
        Rgb(channel_map.map(|channel| array[[y, x, channel]]))
    });
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use learner_config::Color;
    use learner_data::ImageRasterSource;

    #[test]
    fn single_channel_is_replicated() -> Result<()> {
        let mut array = Array3::zeros((2, 3, 1));
        array[[1, 2, 0]] = 42;
        let image = to_rgb_image(&array)?;
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(2, 1), &Rgb([42, 42, 42]));
        Ok(())
    }

    #[test]
    fn cells_are_outlined_inside() -> Result<()> {
        let raster = ImageRasterSource::new(Array3::zeros((12, 12, 3)), None)?;
        let mut class_config = ClassConfig::new(["a", "b"]);
        class_config.colors = Some(vec![
            Color::Rgb(0, 0, 255),
            Color::Name("red".into()),
        ]);
        let labels: ClassificationLabels = [(PixelBox::new(0, 0, 12, 12)?, 1)]
            .into_iter()
            .collect();

        let image = draw_debug_predict_image(&raster, &labels, &class_config, 4)?;
        let red = Rgb([255, 0, 0]);
        assert_eq!(image.get_pixel(0, 0), &red);
        assert_eq!(image.get_pixel(3, 6), &red);
        assert_eq!(image.get_pixel(11, 11), &red);
        assert_eq!(image.get_pixel(4, 4), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(7, 7), &Rgb([0, 0, 0]));
        Ok(())
    }
}
