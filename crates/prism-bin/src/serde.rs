/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use prism_image::metadata::ImageMetadata;
use prism_jxl::decoder::DecodedImage;
use prism_jxl::errors::JxlErrors;

/// What `probe` prints for one file
pub struct Metadata<'a> {
    file:     &'a str,
    size:     u64,
    image:    &'a DecodedImage,
    warnings: &'a [JxlErrors]
}

impl<'a> Metadata<'a> {
    pub fn new(
        file: &'a str, size: u64, image: &'a DecodedImage, warnings: &'a [JxlErrors]
    ) -> Metadata<'a> {
        Metadata {
            file,
            size,
            image,
            warnings
        }
    }
}

impl<'a> Serialize for Metadata<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let image = self.image;
        let (width, height) = image.dimensions();
        let precision = image.precision();

        let mut state = serializer.serialize_struct("Metadata", 11)?;

        state.serialize_field("file", self.file)?;
        state.serialize_field("size", &self.size)?;
        state.serialize_field("width", &width)?;
        state.serialize_field("height", &height)?;
        state.serialize_field("color_model", &format!("{:?}", image.color_model()))?;
        state.serialize_field("has_alpha", &image.has_alpha())?;
        state.serialize_field("depth", &format!("{:?}", precision.depth()))?;
        state.serialize_field("linear", &precision.is_linear())?;
        state.serialize_field("profile", &image.profile().map(|x| x.name().to_string()))?;
        state.serialize_field("metadata", &MetadataBlobs(image.metadata()))?;
        let warnings: Vec<String> = self
            .warnings
            .iter()
            .map(|x| format!("{x:?}").trim_end().to_string())
            .collect();
        state.serialize_field("warnings", &warnings)?;

        state.end()
    }
}

/// Blob sizes and the number of parsed Exif fields
struct MetadataBlobs<'a>(&'a ImageMetadata);

impl<'a> Serialize for MetadataBlobs<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer
    {
        let metadata = self.0;
        let mut state = serializer.serialize_struct("MetadataBlobs", 3)?;

        state.serialize_field("exif", &metadata.exif().map_or(0, <[u8]>::len))?;
        state.serialize_field("exif_fields", &metadata.exif_fields().map_or(0, <[_]>::len))?;
        state.serialize_field("xmp", &metadata.xmp().map_or(0, <[u8]>::len))?;

        state.end()
    }
}

#[cfg(test)]
mod tests {
    use prism_image::metadata::ImageMetadata;

    use crate::serde::MetadataBlobs;

    #[test]
    fn exif_fields_are_counted() {
        // little endian TIFF, one IFD with Orientation and a second SHORT tag
        let exif = vec![
            b'I', b'I', 42, 0, 8, 0, 0, 0, // header, IFD at 8
            2, 0, // two entries
            0x12, 0x01, 3, 0, 1, 0, 0, 0, 1, 0, 0, 0, // Orientation = 1
            0x28, 0x01, 3, 0, 1, 0, 0, 0, 2, 0, 0, 0, // ResolutionUnit = 2
            0, 0, 0, 0 // no next IFD
        ];
        let mut metadata = ImageMetadata::default();
        metadata.set_exif(Some(exif.clone()));
        metadata.set_xmp(Some(b"<x:xmpmeta/>".to_vec()));

        let value = serde_json::to_value(MetadataBlobs(&metadata)).unwrap();
        assert_eq!(value["exif"], exif.len());
        assert_eq!(value["exif_fields"], 2);
        assert_eq!(value["xmp"], 12);
    }

    #[test]
    fn unparsable_exif_still_reports_its_size() {
        let mut metadata = ImageMetadata::default();
        metadata.set_exif(Some(vec![1, 2, 3, 4]));

        let value = serde_json::to_value(MetadataBlobs(&metadata)).unwrap();
        assert_eq!(value["exif"], 4);
        assert_eq!(value["exif_fields"], 0);
        assert_eq!(value["xmp"], 0);
    }
}
