/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use clap::builder::PossibleValue;
use clap::{value_parser, Arg, ArgAction, Command, ValueEnum};
use prism_core::bit_depth::BitDepth;

/// Sample depth of written files
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IDepth {
    Eight,
    Sixteen
}

impl IDepth {
    pub const fn to_depth(self) -> BitDepth {
        match self {
            IDepth::Eight => BitDepth::Eight,
            IDepth::Sixteen => BitDepth::Sixteen
        }
    }
}

impl ValueEnum for IDepth {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Eight, Self::Sixteen]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            Self::Eight => PossibleValue::new("8"),
            Self::Sixteen => PossibleValue::new("16")
        })
    }
}

#[rustfmt::skip]
fn encoder_args(cmd: Command) -> Command {
    cmd
        .arg(Arg::new("distance")
            .long("distance")
            .help_heading("ENCODING")
            .help("Butteraugli distance of lossy output, 0.1 to 15")
            .long_help("Encode lossy with this butteraugli distance, lower is better.\nWithout it files are written losslessly")
            .value_parser(value_parser!(f32)))
        .arg(Arg::new("effort")
            .long("effort")
            .help_heading("ENCODING")
            .help("Encoder effort, 1 (fast) to 9 (slow)")
            .default_value("7")
            .value_parser(value_parser!(u8).range(1..=9)))
        .arg(Arg::new("depth")
            .long("depth")
            .help_heading("ENCODING")
            .help("Bits per sample of the written file")
            .default_value("8")
            .value_parser(value_parser!(IDepth)))
        .arg(Arg::new("keep-profile")
            .long("keep-profile")
            .help_heading("ENCODING")
            .action(ArgAction::SetTrue)
            .help("Keep the color profile of the input instead of converting to sRGB"))
        .arg(Arg::new("no-exif")
            .long("no-exif")
            .help_heading("ENCODING")
            .action(ArgAction::SetTrue)
            .help("Do not copy Exif metadata"))
        .arg(Arg::new("no-xmp")
            .long("no-xmp")
            .help_heading("ENCODING")
            .action(ArgAction::SetTrue)
            .help("Do not copy XMP metadata"))
}

#[rustfmt::skip]
fn probe() -> Command {
    Command::new("probe")
        .about("Decode files and print what they contain as json")
        .arg(Arg::new("in")
            .help("Files to probe")
            .action(ArgAction::Append)
            .required(true))
}

#[rustfmt::skip]
fn convert() -> Command {
    encoder_args(Command::new("convert")
        .about("Decode a JPEG XL file and write it again")
        .arg(Arg::new("in")
            .short('i')
            .long("input")
            .help("Input file to read data from")
            .required(true))
        .arg(Arg::new("out")
            .short('o')
            .long("output")
            .help("Output to write the data to")
            .required(true)))
}

#[rustfmt::skip]
fn value_blend() -> Command {
    encoder_args(Command::new("value-blend")
        .about("Composite a layer onto a base in the legacy HSV value mode")
        .long_about("Keeps the hue and saturation of the base and takes the value of the layer.\nAll inputs are JPEG XL files of the same dimensions")
        .arg(Arg::new("base")
            .long("base")
            .help("Image to composite onto")
            .required(true))
        .arg(Arg::new("layer")
            .long("layer")
            .help("Image whose value is taken")
            .required(true))
        .arg(Arg::new("mask")
            .long("mask")
            .help("Image whose first channel scales the layer coverage"))
        .arg(Arg::new("opacity")
            .long("opacity")
            .help("Opacity of the layer, 0 to 1")
            .default_value("1.0")
            .value_parser(value_parser!(f32)))
        .arg(Arg::new("out")
            .short('o')
            .long("output")
            .help("Output to write the data to")
            .required(true)))
}

#[rustfmt::skip]
pub fn create_cmd_args() -> Command {
    Command::new("prism")
        .about("Read, write and blend JPEG XL images")
        .subcommand_required(true)
        .subcommand(probe())
        .subcommand(convert())
        .subcommand(value_blend())
        .arg(Arg::new("debug")
            .long("debug")
            .global(true)
            .action(ArgAction::SetTrue)
            .help_heading("LOGGING")
            .help("Display debug information and higher"))
        .arg(Arg::new("trace")
            .long("trace")
            .global(true)
            .action(ArgAction::SetTrue)
            .help_heading("LOGGING")
            .help("Display very verbose information"))
        .arg(Arg::new("warn")
            .long("warn")
            .global(true)
            .action(ArgAction::SetTrue)
            .help_heading("LOGGING")
            .help("Display warnings and errors"))
        .arg(Arg::new("info")
            .long("info")
            .global(true)
            .action(ArgAction::SetTrue)
            .help_heading("LOGGING")
            .help("Display information about the decoding options"))
        .arg(Arg::new("max-width")
            .long("max-width")
            .global(true)
            .help_heading("ADVANCED")
            .help("Refuse to decode images wider than this")
            .default_value("16384")
            .value_parser(value_parser!(usize)))
        .arg(Arg::new("max-height")
            .long("max-height")
            .global(true)
            .help_heading("ADVANCED")
            .help("Refuse to decode images taller than this")
            .default_value("16384")
            .value_parser(value_parser!(usize)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_is_well_formed() {
        create_cmd_args().debug_assert();
    }

    #[test]
    fn convert_parses() {
        let matches = create_cmd_args()
            .try_get_matches_from(["prism", "convert", "-i", "a.jxl", "-o", "b.jxl", "--depth", "16"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "convert");
        assert_eq!(sub.get_one::<IDepth>("depth"), Some(&IDepth::Sixteen));
        assert_eq!(sub.get_one::<u8>("effort"), Some(&7));
        assert!(sub.get_one::<f32>("distance").is_none());
    }

    #[test]
    fn effort_is_range_checked() {
        let result = create_cmd_args().try_get_matches_from([
            "prism", "convert", "-i", "a.jxl", "-o", "b.jxl", "--effort", "12"
        ]);
        assert!(result.is_err());
    }
}
