//! Image transforms applied to chips at read time.

use crate::common::*;
use image::imageops::FilterType;
use ndarray::stack;
use rand_distr::Normal;

/// A validated [TransformConfig] ready to apply on (height, width, channel) chips.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    config: TransformConfig,
}

impl Transform {
    pub fn new(config: &TransformConfig) -> Result<Self> {
        config.validate_config()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn apply<R>(&self, chip: Array3<u8>, rng: &mut R) -> Result<Array3<u8>>
    where
        R: Rng,
    {
        apply_config(&self.config, chip, rng)
    }
}

fn apply_config<R>(config: &TransformConfig, chip: Array3<u8>, rng: &mut R) -> Result<Array3<u8>>
where
    R: Rng,
{
    use TransformConfig as T;

    let chip = match *config {
        T::Resize { height, width } => resize(&chip, height.get(), width.get())?,
        T::Blur { blur_limit, p } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            let ksize = random_odd_ksize(3, blur_limit, rng);
            box_blur(&chip, ksize)
        }
        T::RandomRotate90 { p } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            let quarter_turns = rng.gen_range(0..4);
            map_channels(&chip, |channel| match quarter_turns {
                1 => imageops::rotate90(&channel),
                2 => imageops::rotate180(&channel),
                3 => imageops::rotate270(&channel),
                _ => channel,
            })?
        }
        T::HorizontalFlip { p } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            chip.slice(s![.., ..;-1, ..]).to_owned()
        }
        T::VerticalFlip { p } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            chip.slice(s![..;-1, .., ..]).to_owned()
        }
        T::GaussianBlur {
            blur_limit: (min, max),
            p,
        } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            let ksize = random_odd_ksize(min, max, rng);
            let sigma = 0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8;
            map_channels(&chip, |channel| imageops::blur(&channel, sigma))?
        }
        T::GaussNoise {
            var_limit: (min, max),
            mean,
            p,
        } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            let var = if min < max {
                rng.gen_range(min.raw()..=max.raw())
            } else {
                min.raw()
            };
            let normal = Normal::new(mean.raw(), var.sqrt())
                .map_err(|err| format_err!("invalid noise distribution: {}", err))?;
            chip.mapv(|value| {
                let noise: f64 = normal.sample(rng);
                (value as f64 + noise).round().clamp(0.0, 255.0) as u8
            })
        }
        T::RgbShift {
            r_shift_limit,
            g_shift_limit,
            b_shift_limit,
            p,
        } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            let mut chip = chip;
            let limits = [r_shift_limit, g_shift_limit, b_shift_limit];
            let num_shifted = chip.dim().2.min(3);
            for (index, limit) in limits.into_iter().enumerate().take(num_shifted) {
                let limit = limit as i16;
                let shift = rng.gen_range(-limit..=limit);
                chip.index_axis_mut(Axis(2), index)
                    .mapv_inplace(|value| (value as i16 + shift).clamp(0, 255) as u8);
            }
            chip
        }
        T::ToGray { p } => {
            if !rng.gen_bool(p.to_f64()) {
                return Ok(chip);
            }
            to_gray(chip)
        }
        T::MinMaxNormalize { min_val, max_val } => min_max_normalize(chip, min_val, max_val),
        T::Compose { ref transforms } => {
            return transforms
                .iter()
                .try_fold(chip, |chip, transform| apply_config(transform, chip, rng));
        }
    };
    Ok(chip)
}

/// Pick an odd kernel size in `[min, max]`, falling back to `min` for an empty range.
fn random_odd_ksize<R>(min: usize, max: usize, rng: &mut R) -> usize
where
    R: Rng,
{
    let min = min | 1;
    let candidates: Vec<usize> = (min..=max).step_by(2).collect();
    candidates.choose(rng).copied().unwrap_or(min)
}

fn channel_image(chip: &Array3<u8>, index: usize) -> Result<GrayImage> {
    let (height, width, _) = chip.dim();
    let pixels: Vec<u8> = chip.index_axis(Axis(2), index).iter().copied().collect();
    GrayImage::from_raw(width as u32, height as u32, pixels)
        .ok_or_else(|| format_err!("channel {} does not fit a {}x{} image", index, height, width))
}

/// Transform every channel as a grayscale image and stack the results.
fn map_channels<F>(chip: &Array3<u8>, mut f: F) -> Result<Array3<u8>>
where
    F: FnMut(GrayImage) -> GrayImage,
{
    let channels: Vec<Array2<u8>> = (0..chip.dim().2)
        .map(|index| -> Result<_> {
            let image = f(channel_image(chip, index)?);
            let (width, height) = image.dimensions();
            let array = Array2::from_shape_vec((height as usize, width as usize), image.into_raw())?;
            Ok(array)
        })
        .collect::<Result<_>>()?;
    let views: Vec<ArrayView2<u8>> = channels.iter().map(|channel| channel.view()).collect();
    Ok(stack(Axis(2), &views)?)
}

/// Bilinear resize of every channel.
pub fn resize(chip: &Array3<u8>, height: usize, width: usize) -> Result<Array3<u8>> {
    let (orig_h, orig_w, _) = chip.dim();
    if (orig_h, orig_w) == (height, width) {
        return Ok(chip.clone());
    }
    map_channels(chip, |channel| {
        imageops::resize(&channel, width as u32, height as u32, FilterType::Triangle)
    })
}

/// Mean filter with replicated borders.
fn box_blur(chip: &Array3<u8>, ksize: usize) -> Array3<u8> {
    let (height, width, _) = chip.dim();
    let radius = (ksize / 2) as isize;
    let clip = |value: isize, len: usize| value.clamp(0, len as isize - 1) as usize;
    let area = (ksize * ksize) as u32;

    Array3::from_shape_fn(chip.dim(), |(row, col, channel)| {
        let sum: u32 = (-radius..=radius)
            .flat_map(|dy| (-radius..=radius).map(move |dx| (dy, dx)))
            .map(|(dy, dx)| {
                let y = clip(row as isize + dy, height);
                let x = clip(col as isize + dx, width);
                chip[[y, x, channel]] as u32
            })
            .sum();
        ((sum + area / 2) / area) as u8
    })
}

/// Replace the first three channels by their luminance.
fn to_gray(mut chip: Array3<u8>) -> Array3<u8> {
    if chip.dim().2 < 3 {
        return chip;
    }
    let (height, width, _) = chip.dim();
    for row in 0..height {
        for col in 0..width {
            let [r, g, b] = [0, 1, 2].map(|channel| chip[[row, col, channel]] as f32);
            let gray = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
            chip.slice_mut(s![row, col, 0..3]).fill(gray);
        }
    }
    chip
}

fn min_max_normalize(mut chip: Array3<u8>, min_val: u8, max_val: u8) -> Array3<u8> {
    let out_range = (max_val - min_val) as f32;
    for mut channel in chip.axis_iter_mut(Axis(2)) {
        let (lo, hi) = channel
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), &value| (lo.min(value), hi.max(value)));
        if lo >= hi {
            channel.fill(min_val);
            continue;
        }
        let in_range = (hi - lo) as f32;
        channel.mapv_inplace(|value| {
            let scaled = (value - lo) as f32 / in_range * out_range + min_val as f32;
            scaled.round() as u8
        });
    }
    chip
}

#[cfg(test)]
mod tests {
    use super::*;
    use learner_config::Augmentor;
    use std::num::NonZeroUsize;

    fn always() -> Proportion {
        Proportion::new(1.0).unwrap()
    }

    fn gradient(height: usize, width: usize, channels: usize) -> Array3<u8> {
        Array3::from_shape_fn((height, width, channels), |(row, col, channel)| {
            (row * 10 + col + channel) as u8
        })
    }

    #[test]
    fn resize_keeps_channels() -> Result<()> {
        let transform = Transform::new(&TransformConfig::Resize {
            height: NonZeroUsize::new(8).unwrap(),
            width: NonZeroUsize::new(6).unwrap(),
        })?;
        let output = transform.apply(gradient(4, 3, 5), &mut StdRng::seed_from_u64(0))?;
        assert_eq!(output.dim(), (8, 6, 5));
        Ok(())
    }

    #[test]
    fn flips_reverse_axes() -> Result<()> {
        let chip = gradient(2, 3, 1);
        let mut rng = StdRng::seed_from_u64(0);

        let flipped =
            Transform::new(&TransformConfig::HorizontalFlip { p: always() })?.apply(chip.clone(), &mut rng)?;
        assert_eq!(flipped[[0, 0, 0]], chip[[0, 2, 0]]);
        assert_eq!(flipped[[1, 2, 0]], chip[[1, 0, 0]]);

        let flipped =
            Transform::new(&TransformConfig::VerticalFlip { p: always() })?.apply(chip.clone(), &mut rng)?;
        assert_eq!(flipped[[0, 1, 0]], chip[[1, 1, 0]]);
        Ok(())
    }

    #[test]
    fn rotation_swaps_dimensions_or_keeps_them() -> Result<()> {
        let transform = Transform::new(&TransformConfig::RandomRotate90 { p: always() })?;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..8 {
            let output = transform.apply(gradient(2, 5, 3), &mut rng)?;
            let (height, width, channels) = output.dim();
            assert_eq!(channels, 3);
            assert!((height, width) == (2, 5) || (height, width) == (5, 2));
        }
        Ok(())
    }

    #[test]
    fn min_max_normalize_stretches_channels() -> Result<()> {
        let mut chip = Array3::zeros((1, 3, 2));
        chip.slice_mut(s![0, .., 0]).assign(&ndarray::arr1(&[10, 20, 30]));
        chip.slice_mut(s![0, .., 1]).fill(7);

        let transform = Transform::new(&TransformConfig::min_max_normalize())?;
        let output = transform.apply(chip, &mut StdRng::seed_from_u64(0))?;
        assert_eq!(output.slice(s![0, .., 0]).to_vec(), [0, 128, 255]);
        assert_eq!(output.slice(s![0, .., 1]).to_vec(), [0, 0, 0]);
        Ok(())
    }

    #[test]
    fn to_gray_leaves_extra_channels() -> Result<()> {
        let mut chip = Array3::zeros((1, 1, 4));
        chip.slice_mut(s![0, 0, ..]).assign(&ndarray::arr1(&[255, 0, 0, 9]));
        let output = Transform::new(&TransformConfig::ToGray { p: always() })?
            .apply(chip, &mut StdRng::seed_from_u64(0))?;
        assert_eq!(output.slice(s![0, 0, ..]).to_vec(), [76, 76, 76, 9]);
        Ok(())
    }

    #[test]
    fn box_blur_of_constant_is_constant() {
        let chip = Array3::from_elem((5, 5, 2), 42u8);
        assert_eq!(box_blur(&chip, 3), chip);
    }

    #[test]
    fn catalog_transforms_keep_shape() -> Result<()> {
        let transforms = Augmentor::names()
            .into_iter()
            .map(|name| Ok(name.parse::<Augmentor>()?.transform()))
            .collect::<Result<_>>()?;
        let transform = Transform::new(&TransformConfig::Compose { transforms })?;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..4 {
            let output = transform.apply(gradient(6, 6, 3), &mut rng)?;
            assert_eq!(output.dim(), (6, 6, 3));
        }
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = TransformConfig::Blur {
            blur_limit: 1,
            p: always(),
        };
        assert!(Transform::new(&config).is_err());
    }
}
