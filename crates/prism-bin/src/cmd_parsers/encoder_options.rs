/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use clap::ArgMatches;
use log::info;
use prism_core::options::EncoderOptions;

use crate::cmd_args::IDepth;

/// Build encoder options from the encoding arguments of a command
///
/// Output is lossless unless a distance is given
pub fn parse_encoder_options(args: &ArgMatches) -> EncoderOptions {
    let mut options = EncoderOptions::default();

    match args.get_one::<f32>("distance") {
        Some(distance) => {
            info!("Encoding lossy at distance {distance}");
            options = options.set_lossless(false).set_distance(*distance);
        }
        None => {
            info!("Encoding losslessly");
            options = options.set_lossless(true);
        }
    }
    if let Some(effort) = args.get_one::<u8>("effort") {
        options = options.set_effort(*effort);
    }
    if let Some(depth) = args.get_one::<IDepth>("depth") {
        options = options.set_depth(depth.to_depth());
    }
    let flag = |name: &str| args.get_one::<bool>(name).copied().unwrap_or(false);

    options
        .set_keep_profile(flag("keep-profile"))
        .set_save_exif(!flag("no-exif"))
        .set_save_xmp(!flag("no-xmp"))
}
