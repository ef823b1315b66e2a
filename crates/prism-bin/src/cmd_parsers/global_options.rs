/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use clap::ArgMatches;
use log::{info, Level};
use prism_core::options::DecoderOptions;

fn flag(options: &ArgMatches, name: &str) -> bool {
    options.get_one::<bool>(name).copied().unwrap_or(false)
}

/// Set up logging options
pub fn setup_logger(options: &ArgMatches) {
    let log_level = if flag(options, "debug") {
        Level::Debug
    } else if flag(options, "trace") {
        Level::Trace
    } else if flag(options, "info") {
        Level::Info
    } else {
        Level::Warn
    };

    if let Err(err) = simple_logger::init_with_level(log_level) {
        eprintln!("Could not set up logging: {err}");
        return;
    }

    info!("Initialized logger");
    info!("Log level :{}", log_level);
}

/// Decoder options shared by all commands
pub fn parse_decoder_options(options: &ArgMatches) -> DecoderOptions {
    let mut decoder_options = DecoderOptions::default();

    if let Some(width) = options.get_one::<usize>("max-width") {
        decoder_options = decoder_options.set_max_width(*width);
    }
    if let Some(height) = options.get_one::<usize>("max-height") {
        decoder_options = decoder_options.set_max_height(*height);
    }
    info!(
        "Maximum dimensions: {}x{}",
        decoder_options.get_max_width(),
        decoder_options.get_max_height()
    );
    decoder_options
}
