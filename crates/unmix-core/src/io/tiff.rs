use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{Result, UnmixError};
use crate::io::source::ImageSource;
use crate::region::CropRect;

/// Chunk-lazy reader for (OME-)TIFF stacks.
///
/// The channel axis is taken from the first top-level image: either the
/// interleaved samples of page 0, or, for one-sample pages, the run of
/// initial pages sharing page 0's dimensions (one page per channel, the
/// usual OME-TIFF layout). Sub-resolution pyramid levels follow that run
/// and are never touched.
///
/// Region reads decode only the TIFF chunks (strips or tiles) that
/// intersect the crop, so peak memory tracks the crop size rather than the
/// slide size.
pub struct TiffSource {
    decoder: Decoder<BufReader<File>>,
    height: usize,
    width: usize,
    channels: usize,
    /// true = one page per channel, false = interleaved samples on page 0
    planar: bool,
}

impl TiffSource {
    pub fn open(path: &Path) -> Result<TiffSource> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());

        let (width, height) = decoder.dimensions()?;
        let spp = samples_per_pixel(&mut decoder)?;

        let (channels, planar) = if spp > 1 {
            (spp, false)
        } else {
            (count_channel_pages(&mut decoder, width, height)?, true)
        };

        debug!(
            width,
            height,
            channels,
            planar,
            path = %path.display(),
            "Opened TIFF source"
        );

        Ok(TiffSource {
            decoder,
            height: height as usize,
            width: width as usize,
            channels,
            planar,
        })
    }

    /// Copy every chunk of the current page that intersects `rect` into
    /// `out`. For planar pages `spp` is 1 and `channel_base` is the page's
    /// channel index; for interleaved pages sample `s` maps to channel `s`.
    fn copy_chunks(
        &mut self,
        out: &mut Array3<f64>,
        rect: &CropRect,
        channel_base: usize,
        spp: usize,
    ) -> Result<()> {
        let (cw, ch) = self.decoder.chunk_dimensions();
        let (cw, ch) = (cw as usize, ch as usize);
        let chunks_across = self.width.div_ceil(cw);
        let chunks_down = self.height.div_ceil(ch);

        for cy in 0..chunks_down {
            let row0 = cy * ch;
            if row0 >= rect.y + rect.height || row0 + ch <= rect.y {
                continue;
            }
            for cx in 0..chunks_across {
                let col0 = cx * cw;
                if col0 >= rect.x + rect.width || col0 + cw <= rect.x {
                    continue;
                }

                let idx = (cy * chunks_across + cx) as u32;
                let (dw, dh) = self.decoder.chunk_data_dimensions(idx);
                let (dw, dh) = (dw as usize, dh as usize);
                let data = decode_to_f64(self.decoder.read_chunk(idx)?)?;
                if data.len() < dw * dh * spp {
                    return Err(UnmixError::ShapeMismatch(format!(
                        "TIFF chunk {idx} holds {} samples, expected {}",
                        data.len(),
                        dw * dh * spp
                    )));
                }

                let r_lo = rect.y.max(row0);
                let r_hi = (rect.y + rect.height).min(row0 + dh);
                let c_lo = rect.x.max(col0);
                let c_hi = (rect.x + rect.width).min(col0 + dw);

                for r in r_lo..r_hi {
                    for c in c_lo..c_hi {
                        let base = ((r - row0) * dw + (c - col0)) * spp;
                        for s in 0..spp {
                            out[[r - rect.y, c - rect.x, channel_base + s]] = data[base + s];
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl ImageSource for TiffSource {
    fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    fn read_region(&mut self, crop: Option<&CropRect>) -> Result<Array3<f64>> {
        let rect = match crop {
            Some(rect) => rect.validated(self.width, self.height)?,
            None => CropRect {
                x: 0,
                y: 0,
                width: self.width,
                height: self.height,
            },
        };

        let mut out = Array3::<f64>::zeros((rect.height, rect.width, self.channels));

        if self.planar {
            for channel in 0..self.channels {
                self.decoder.seek_to_image(channel)?;
                self.copy_chunks(&mut out, &rect, channel, 1)?;
            }
        } else {
            self.decoder.seek_to_image(0)?;
            self.copy_chunks(&mut out, &rect, 0, self.channels)?;
        }

        Ok(out)
    }
}

fn samples_per_pixel(decoder: &mut Decoder<BufReader<File>>) -> Result<usize> {
    match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(value) => Ok(value.into_u32()? as usize),
        None => Ok(1),
    }
}

/// Count the run of initial one-sample pages sharing page 0's dimensions.
/// Leaves the decoder positioned back on page 0.
fn count_channel_pages(
    decoder: &mut Decoder<BufReader<File>>,
    width: u32,
    height: u32,
) -> Result<usize> {
    let mut channels = 1;
    while decoder.more_images() {
        decoder.next_image()?;
        if decoder.dimensions()? != (width, height) || samples_per_pixel(decoder)? != 1 {
            break;
        }
        channels += 1;
    }
    decoder.seek_to_image(0)?;
    Ok(channels)
}

fn decode_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    Ok(match result {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
        _ => {
            return Err(UnmixError::Pipeline(
                "Unsupported TIFF sample format".into(),
            ))
        }
    })
}
