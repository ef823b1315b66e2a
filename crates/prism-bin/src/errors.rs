/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

use std::fmt::{Debug, Display, Formatter};

use prism_image::errors::ImageErrors;
use prism_jxl::errors::JxlErrors;

/// Errors a command can end with
pub enum CmdErrors {
    Io(String, std::io::Error),
    Jxl(JxlErrors),
    Image(ImageErrors),
    Json(serde_json::Error),
    Generic(String)
}

impl Debug for CmdErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(file, err) => writeln!(f, "{file}: {err}"),
            Self::Jxl(err) => writeln!(f, "{err:?}"),
            Self::Image(err) => writeln!(f, "{err:?}"),
            Self::Json(err) => writeln!(f, "Could not serialize output: {err}"),
            Self::Generic(err) => writeln!(f, "{err}")
        }
    }
}

impl Display for CmdErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{self:?}")
    }
}

impl std::error::Error for CmdErrors {}

impl From<JxlErrors> for CmdErrors {
    fn from(value: JxlErrors) -> Self {
        CmdErrors::Jxl(value)
    }
}

impl From<ImageErrors> for CmdErrors {
    fn from(value: ImageErrors) -> Self {
        CmdErrors::Image(value)
    }
}

impl From<serde_json::Error> for CmdErrors {
    fn from(value: serde_json::Error) -> Self {
        CmdErrors::Json(value)
    }
}
