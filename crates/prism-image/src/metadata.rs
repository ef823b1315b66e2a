/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Image metadata
//!
//! Exif and XMP are carried as opaque blobs so they survive a decode and
//! re-encode untouched. With the `metadata` feature, Exif is also parsed
//! into fields for inspection.
mod exif;

/// Metadata blobs attached to an image
#[derive(Clone, Debug, Default)]
pub struct ImageMetadata {
    /// Exif as a TIFF stream, starting at the byte order mark
    pub(crate) exif:        Option<Vec<u8>>,
    /// An XMP packet
    pub(crate) xmp:         Option<Vec<u8>>,
    #[cfg(feature = "metadata")]
    pub(crate) exif_fields: Option<Vec<::exif::Field>>
}

impl ImageMetadata {
    /// Return the raw Exif stream, if present
    pub fn exif(&self) -> Option<&[u8]> {
        self.exif.as_deref()
    }

    /// Return the XMP packet, if present
    pub fn xmp(&self) -> Option<&[u8]> {
        self.xmp.as_deref()
    }

    /// Set the raw Exif stream
    ///
    /// The stream must start at the TIFF header (`II*\0` or `MM\0*`).
    /// With the `metadata` feature the stream is also parsed into fields,
    /// a stream that fails to parse is still kept
    pub fn set_exif(&mut self, exif: Option<Vec<u8>>) {
        #[cfg(feature = "metadata")]
        {
            self.exif_fields = None;
            if let Some(data) = &exif {
                self.parse_raw_exif(data);
            }
        }
        self.exif = exif;
    }

    pub fn set_xmp(&mut self, xmp: Option<Vec<u8>>) {
        self.xmp = xmp;
    }

    /// Return the parsed exif fields of an image or none if it
    /// doesn't exist or could not be parsed
    ///
    /// This requires the metadata feature
    #[cfg(feature = "metadata")]
    pub fn exif_fields(&self) -> Option<&[::exif::Field]> {
        self.exif_fields.as_deref()
    }

    /// Whether any blob is attached
    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.xmp.is_none()
    }
}
