/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

#![cfg(feature = "metadata")]

use prism_core::log::{trace, warn};

use crate::metadata::ImageMetadata;

impl ImageMetadata {
    /// Parse a raw Exif stream and store its fields
    ///
    /// Data should point to the TIFF header
    pub(crate) fn parse_raw_exif(&mut self, data: &[u8]) {
        trace!("Parsing exif data");

        match exif::Reader::new().read_raw(data.to_vec()) {
            Ok(exif) => {
                self.exif_fields = Some(exif.fields().cloned().collect());
            }
            Err(err) => {
                warn!("Error while parsing exif chunk {:?}", err)
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use crate::metadata::ImageMetadata;

    // big endian TIFF with one IFD holding a single Orientation entry
    const ORIENTATION_EXIF: [u8; 26] = [
        b'M', b'M', 0, 42, 0, 0, 0, 8, // header, IFD at 8
        0, 1, // one entry
        0x01, 0x12, 0, 3, 0, 0, 0, 1, 0, 6, 0, 0, // Orientation, SHORT, 1, value 6
        0, 0, 0, 0 // no next IFD
    ];

    #[test]
    fn fields_are_parsed() {
        let mut metadata = ImageMetadata::default();
        metadata.set_exif(Some(ORIENTATION_EXIF.to_vec()));

        let fields = metadata.exif_fields().expect("parsed");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].tag, exif::Tag::Orientation);
    }

    #[test]
    fn bad_exif_has_no_fields() {
        let mut metadata = ImageMetadata::default();
        metadata.set_exif(Some(vec![1, 2, 3, 4]));
        assert!(metadata.exif_fields().is_none());
        assert!(metadata.exif().is_some());
    }
}
