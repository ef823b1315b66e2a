/*
 * Copyright (c) 2023.
 *
 * This software is free software;
 *
 * You can redistribute it or modify it under terms of the MIT, Apache License or Zlib license
 */

//! Backends shipped with the crate
//!
//! - [`OxideDecoder`](oxide::OxideDecoder): decoding through jxl-oxide, `oxide` feature
//! - [`ZuneEncoder`](zune::ZuneEncoder): lossless encoding through zune-jpegxl, `zune` feature
pub mod oxide;
pub mod zune;
