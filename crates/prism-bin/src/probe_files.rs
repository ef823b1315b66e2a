/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use clap::ArgMatches;
use log::info;
use prism_jxl::backends::oxide::OxideDecoder;
use prism_jxl::decoder::JxlDecoder;

use crate::cmd_parsers::global_options::parse_decoder_options;
use crate::errors::CmdErrors;
use crate::serde::Metadata;
use crate::workflow::read_file;

/// Probe input files, decode them, and print what they hold to standard output.
pub fn probe_input_files(args: &ArgMatches, global: &ArgMatches) -> Result<(), CmdErrors> {
    // headers are all that matter, lift the limits
    let options = parse_decoder_options(global)
        .set_max_width(usize::MAX)
        .set_max_height(usize::MAX);

    for in_file in args.get_many::<String>("in").into_iter().flatten() {
        info!("Probing {in_file}");
        let data = read_file(in_file)?;

        let mut decoder = JxlDecoder::new_with_backend(&data, options, OxideDecoder::new());
        let image = decoder.decode()?;

        let metadata = Metadata::new(in_file, data.len() as u64, &image, decoder.warnings());
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }
    Ok(())
}
