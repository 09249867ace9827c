//! `Accept` header negotiation for image downloads.

use axum::http::header::ACCEPT;
use axum::http::HeaderMap;
use domains::ImageFormat;
use mime::Mime;

use crate::error::ApiError;

/// Picks the encoding to serve for an image stored as `stored`.
///
/// Each encoding gets the quality of the most specific range that matches it
/// (`image/png` over `image/*` over `*/*`), so `image/png;q=0` refuses PNG even
/// when a wildcard is also listed. The better-ranked encoding wins and ties go
/// to the stored one. Without a usable header the stored encoding is served.
pub fn image_format(headers: &HeaderMap, stored: ImageFormat) -> Result<ImageFormat, ApiError> {
    let Some(accept) = headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
    else {
        return Ok(stored);
    };

    let ranges: Vec<Mime> = accept
        .split(',')
        .filter_map(|range| range.trim().parse::<Mime>().ok())
        .collect();
    let other = match stored {
        ImageFormat::Jpeg => ImageFormat::Png,
        ImageFormat::Png => ImageFormat::Jpeg,
    };

    let stored_q = quality(&ranges, stored);
    let other_q = quality(&ranges, other);
    if stored_q <= 0.0 && other_q <= 0.0 {
        return Err(ApiError::NotAcceptable);
    }
    Ok(if other_q > stored_q { other } else { stored })
}

fn quality(ranges: &[Mime], format: ImageFormat) -> f32 {
    ranges
        .iter()
        .filter_map(|range| Some((specificity(range, format)?, range)))
        .max_by_key(|(specificity, _)| *specificity)
        .map_or(0.0, |(_, range)| {
            range
                .get_param("q")
                .and_then(|q| q.as_str().parse::<f32>().ok())
                .unwrap_or(1.0)
        })
}

/// How precisely `range` names `format`, or `None` when it does not match.
fn specificity(range: &Mime, format: ImageFormat) -> Option<u8> {
    match (range.type_().as_str(), range.subtype().as_str()) {
        ("*", "*") => Some(0),
        ("image", "*") => Some(1),
        ("image", "jpeg" | "jpg") if format == ImageFormat::Jpeg => Some(2),
        ("image", "png") if format == ImageFormat::Png => Some(2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn accept(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_serves_stored_format() {
        let chosen = image_format(&HeaderMap::new(), ImageFormat::Jpeg).unwrap();
        assert_eq!(chosen, ImageFormat::Jpeg);
    }

    #[test]
    fn explicit_formats_are_honoured() {
        let stored = ImageFormat::Jpeg;
        assert_eq!(image_format(&accept("image/png"), stored).unwrap(), ImageFormat::Png);
        assert_eq!(image_format(&accept("image/jpeg"), stored).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn quality_beats_order() {
        let headers = accept("image/jpeg;q=0.4, image/png;q=0.9");
        assert_eq!(image_format(&headers, ImageFormat::Jpeg).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn ties_keep_the_stored_format() {
        let headers = accept("image/jpeg, image/png");
        assert_eq!(image_format(&headers, ImageFormat::Png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn browser_style_header_keeps_the_stored_format() {
        let headers = accept("image/avif,image/webp,image/*,*/*;q=0.8");
        assert_eq!(image_format(&headers, ImageFormat::Png).unwrap(), ImageFormat::Png);
        assert_eq!(image_format(&headers, ImageFormat::Jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn zero_quality_excludes_a_range() {
        let headers = accept("image/png;q=0, image/jpeg");
        assert_eq!(image_format(&headers, ImageFormat::Png).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn refusal_outranks_a_wildcard() {
        let headers = accept("image/png;q=0, */*;q=0.5");
        assert_eq!(image_format(&headers, ImageFormat::Png).unwrap(), ImageFormat::Jpeg);

        let headers = accept("image/*;q=0.3, image/jpeg;q=0");
        assert_eq!(image_format(&headers, ImageFormat::Jpeg).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn refusing_both_is_not_acceptable() {
        let headers = accept("image/png;q=0, image/jpeg;q=0, */*;q=0.1");
        assert!(matches!(
            image_format(&headers, ImageFormat::Png),
            Err(ApiError::NotAcceptable)
        ));
    }

    #[test]
    fn unsupported_only_is_not_acceptable() {
        assert!(matches!(
            image_format(&accept("image/webp, text/html"), ImageFormat::Jpeg),
            Err(ApiError::NotAcceptable)
        ));
    }
}
