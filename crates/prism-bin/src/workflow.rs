/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::time::Instant;

use clap::ArgMatches;
use log::{debug, info};
use prism_core::colorspace::ColorSpace;
use prism_core::options::DecoderOptions;
use prism_image::buffer::PixelBuffer;
use prism_image::convert::{cmyk_to_rgb, to_rgba_f32};
use prism_image::errors::ImageErrors;
use prism_image::image::{ColorModel, Image, Layer, Precision, Trc};
use prism_image::traits::OperationsTrait;
use prism_imageprocs::hsv_value_legacy::HsvValueLegacy;
use prism_jxl::decoder::LAYER_NAME;
use prism_jxl::{decode_jxl, encode_jxl};

use crate::cmd_parsers::encoder_options::parse_encoder_options;
use crate::cmd_parsers::global_options::parse_decoder_options;
use crate::errors::CmdErrors;
use crate::probe_files::probe_input_files;

pub(crate) fn read_file(file: &str) -> Result<Vec<u8>, CmdErrors> {
    std::fs::read(file).map_err(|e| CmdErrors::Io(file.to_string(), e))
}

fn write_file(file: &str, data: &[u8]) -> Result<(), CmdErrors> {
    std::fs::write(file, data).map_err(|e| CmdErrors::Io(file.to_string(), e))?;
    info!("Wrote {} bytes to {file}", data.len());
    Ok(())
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a String, CmdErrors> {
    args.get_one::<String>(name)
        .ok_or_else(|| CmdErrors::Generic(format!("Missing argument {name}")))
}

fn decode_file(file: &str, options: DecoderOptions) -> Result<Image, CmdErrors> {
    let data = read_file(file)?;
    let start = Instant::now();
    let image = decode_jxl(&data, options)?;
    debug!("Decoding {file} took {:?}", start.elapsed());
    Ok(image)
}

/// The bottom layer as non-linear RGBA floats
fn rgba_layer(image: &Image) -> Result<PixelBuffer, CmdErrors> {
    let layer = image.layer(0)?;
    let trc = image.precision().trc();

    let buffer = if layer.colorspace() == ColorSpace::CMYK {
        let rgb = cmyk_to_rgb(layer.buffer())?;
        to_rgba_f32(&rgb, ColorSpace::RGB, trc, Trc::NonLinear)?
    } else {
        to_rgba_f32(layer.buffer(), layer.colorspace(), trc, Trc::NonLinear)?
    };
    Ok(buffer)
}

fn check_dimensions(base: &Image, other: &Image) -> Result<(), CmdErrors> {
    if base.dimensions() != other.dimensions() {
        return Err(CmdErrors::Image(ImageErrors::DimensionsMisMatch(
            base.dimensions(),
            other.dimensions()
        )));
    }
    Ok(())
}

fn convert(args: &ArgMatches, options: DecoderOptions) -> Result<(), CmdErrors> {
    let input = required(args, "in")?;
    let output = required(args, "out")?;

    let image = decode_file(input, options)?;

    let start = Instant::now();
    let encoded = encode_jxl(&image, parse_encoder_options(args))?;
    debug!("Encoding took {:?}", start.elapsed());

    write_file(output, &encoded)
}

fn value_blend(args: &ArgMatches, options: DecoderOptions) -> Result<(), CmdErrors> {
    let base = decode_file(required(args, "base")?, options)?;
    let layer = decode_file(required(args, "layer")?, options)?;
    let output = required(args, "out")?;
    let opacity = args.get_one::<f32>("opacity").copied().unwrap_or(1.0);

    check_dimensions(&base, &layer)?;

    let mask = match args.get_one::<String>("mask") {
        Some(file) => {
            let mask = decode_file(file, options)?;
            check_dimensions(&base, &mask)?;
            let pixels = rgba_layer(&mask)?;
            // coverage lives in the first channel
            let coverage: Vec<f32> = pixels
                .samples()
                .as_f32()
                .unwrap_or_default()
                .chunks_exact(4)
                .map(|x| x[0])
                .collect();
            Some(coverage)
        }
        None => None
    };

    let (width, height) = base.dimensions();
    let mut image = Image::new(width, height, ColorModel::Rgb, Precision::FLOAT_NON_LINEAR)?;
    image.insert_layer(Layer::new(LAYER_NAME, ColorSpace::RGBA, rgba_layer(&base)?)?, 0)?;
    *image.metadata_mut() = base.metadata().clone();

    let layer_pixels = rgba_layer(&layer)?;
    let mut operation = HsvValueLegacy::new(&layer_pixels, opacity);
    if let Some(mask) = &mask {
        operation = operation.set_mask(mask);
    }
    let start = Instant::now();
    operation.execute(&mut image)?;
    debug!("{} took {:?}", operation.name(), start.elapsed());

    let encoded = encode_jxl(&image, parse_encoder_options(args))?;
    write_file(output, &encoded)
}

/// Run the subcommand the user asked for
pub fn run_command(args: &ArgMatches) -> Result<(), CmdErrors> {
    let options = parse_decoder_options(args);

    match args.subcommand() {
        Some(("probe", sub)) => probe_input_files(sub, args),
        Some(("convert", sub)) => convert(sub, options),
        Some(("value-blend", sub)) => value_blend(sub, options),
        Some((name, _)) => Err(CmdErrors::Generic(format!("Unknown command {name}"))),
        None => Err(CmdErrors::Generic("No command given".to_string()))
    }
}
