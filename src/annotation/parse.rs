//! Pascal VOC XML parsing.
//!
//! Only the fields that end up in the flat table are read: the top-level
//! `<filename>`, the `<size>` block and each `<object>`'s `<name>` and
//! `<bndbox>`. Everything else (`<folder>`, `<source>`, `<pose>`, ...) is
//! ignored.

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;

use crate::error::AnnoprepError;

/// One annotation file, as read from disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedAnnotation {
    pub filename: String,
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub objects: Vec<ParsedObject>,
}

/// One `<object>` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedObject {
    pub name: String,
    pub xmin: i64,
    pub ymin: i64,
    pub xmax: i64,
    pub ymax: i64,
}

/// Read and parse a VOC XML file.
pub fn parse_annotation_file(path: &Path) -> Result<ParsedAnnotation, AnnoprepError> {
    let xml = fs::read_to_string(path).map_err(AnnoprepError::Io)?;
    parse_annotation_str(&xml, path)
}

/// Parse VOC XML from bytes.
///
/// The input must be valid UTF-8. Used by the fuzz target.
pub fn from_annotation_xml_slice(bytes: &[u8]) -> Result<ParsedAnnotation, AnnoprepError> {
    let memory = PathBuf::from("<memory>");
    let xml = std::str::from_utf8(bytes).map_err(|source| AnnoprepError::AnnotationParse {
        path: memory.clone(),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    parse_annotation_str(xml, &memory)
}

/// Parse VOC XML text. `path` is only used for error context.
pub fn parse_annotation_str(xml: &str, path: &Path) -> Result<ParsedAnnotation, AnnoprepError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|source| AnnoprepError::AnnotationParse {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(structure_error(
            path,
            format!(
                "root element is <{}>, expected <annotation>",
                annotation.tag_name().name()
            ),
        ));
    }

    let filename = required_child_text(annotation, "filename", path, "<annotation>")?;

    let size = unique_child_element(annotation, "size", path, "<annotation>")?;
    let width = parse_required_int(size, "width", path, "<size>")?;
    let height = parse_required_int(size, "height", path, "<size>")?;
    let depth = parse_required_int(size, "depth", path, "<size>")?;

    let mut objects = Vec::new();
    for object in annotation
        .children()
        .filter(|node| is_element_named(node, "object"))
    {
        let name = required_child_text(object, "name", path, "<object>")?;
        let bndbox = unique_child_element(object, "bndbox", path, "<object>")?;

        objects.push(ParsedObject {
            name,
            xmin: parse_required_int(bndbox, "xmin", path, "<bndbox>")?,
            ymin: parse_required_int(bndbox, "ymin", path, "<bndbox>")?,
            xmax: parse_required_int(bndbox, "xmax", path, "<bndbox>")?,
            ymax: parse_required_int(bndbox, "ymax", path, "<bndbox>")?,
        });
    }

    Ok(ParsedAnnotation {
        filename,
        width,
        height,
        depth,
        objects,
    })
}

/// `<object>` count of one file, read without validating any field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectCount {
    /// Top-level `<filename>`, if present and non-empty.
    pub filename: Option<String>,
    pub objects: usize,
}

/// Count the top-level `<object>` elements of VOC XML text.
///
/// Only well-formed XML is required; missing `<size>` or bad coordinates do
/// not matter here.
pub fn count_objects_str(xml: &str, path: &Path) -> Result<ObjectCount, AnnoprepError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|source| AnnoprepError::AnnotationParse {
            path: path.to_path_buf(),
            message: source.to_string(),
        })?;
    let root = document.root_element();

    let filename = root
        .children()
        .find(|node| is_element_named(node, "filename"))
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned);
    let objects = root
        .children()
        .filter(|node| is_element_named(node, "object"))
        .count();

    Ok(ObjectCount { filename, objects })
}

/// Parse an integer field, accepting decimal notation.
///
/// Many exporters write `10.0`; such values are rounded half away from zero.
pub fn parse_int_value(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }

    let value = raw.parse::<f64>().ok()?;
    let rounded = value.round();
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded <= i64::MAX as f64 {
        Some(rounded as i64)
    } else {
        None
    }
}

fn structure_error(path: &Path, message: String) -> AnnoprepError {
    AnnoprepError::AnnotationStructure {
        path: path.to_path_buf(),
        message,
    }
}

fn is_element_named(node: &Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

fn unique_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, AnnoprepError> {
    let mut matches = node.children().filter(|child| is_element_named(child, tag));
    let first = matches
        .next()
        .ok_or_else(|| structure_error(path, format!("missing <{tag}> in {context}")))?;

    if matches.next().is_some() {
        return Err(structure_error(
            path,
            format!("more than one <{tag}> in {context}"),
        ));
    }

    Ok(first)
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, AnnoprepError> {
    unique_child_element(node, tag, path, context)?
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| structure_error(path, format!("empty <{tag}> in {context}")))
}

fn parse_required_int(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<i64, AnnoprepError> {
    let raw = required_child_text(node, tag, path, context)?;
    parse_int_value(&raw).ok_or_else(|| AnnoprepError::AnnotationParse {
        path: path.to_path_buf(),
        message: format!("invalid <{tag}> value '{raw}' in {context}; expected an integer"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <folder>images</folder>
  <filename>batch3-17.jpg</filename>
  <size>
    <width>640</width>
    <height>480</height>
    <depth>3</depth>
  </size>
  <object>
    <name>Positive</name>
    <pose>Unspecified</pose>
    <bndbox>
      <xmin>10</xmin>
      <ymin>20.0</ymin>
      <xmax>30.6</xmax>
      <ymax>40</ymax>
    </bndbox>
  </object>
</annotation>"#;

    #[test]
    fn parses_image_fields_and_objects() {
        let parsed = parse_annotation_str(SAMPLE, Path::new("sample.xml")).expect("parse xml");
        assert_eq!(parsed.filename, "batch3-17.jpg");
        assert_eq!((parsed.width, parsed.height, parsed.depth), (640, 480, 3));
        assert_eq!(
            parsed.objects,
            vec![ParsedObject {
                name: "Positive".to_string(),
                xmin: 10,
                ymin: 20,
                xmax: 31,
                ymax: 40,
            }]
        );
    }

    #[test]
    fn missing_size_is_a_structure_error() {
        let xml = "<annotation><filename>a.jpg</filename></annotation>";
        assert!(matches!(
            parse_annotation_str(xml, Path::new("a.xml")),
            Err(AnnoprepError::AnnotationStructure { .. })
        ));
    }

    #[test]
    fn duplicate_filename_is_a_structure_error() {
        let xml = "<annotation><filename>a.jpg</filename><filename>b.jpg</filename>\
                   <size><width>1</width><height>1</height><depth>1</depth></size></annotation>";
        let err = parse_annotation_str(xml, Path::new("a.xml")).expect_err("should fail");
        assert!(err.to_string().contains("more than one <filename>"));
    }

    #[test]
    fn non_numeric_coordinate_is_a_parse_error() {
        let xml = SAMPLE.replace("<xmin>10</xmin>", "<xmin>ten</xmin>");
        assert!(matches!(
            parse_annotation_str(&xml, Path::new("a.xml")),
            Err(AnnoprepError::AnnotationParse { .. })
        ));
    }

    #[test]
    fn wrong_root_is_rejected() {
        let xml = "<dataset><filename>a.jpg</filename></dataset>";
        assert!(parse_annotation_str(xml, Path::new("a.xml")).is_err());
    }

    #[test]
    fn parse_int_value_rounds_decimals() {
        assert_eq!(parse_int_value(" 12 "), Some(12));
        assert_eq!(parse_int_value("12.5"), Some(13));
        assert_eq!(parse_int_value("-2.5"), Some(-3));
        assert_eq!(parse_int_value("NaN"), None);
        assert_eq!(parse_int_value("x"), None);
    }

    #[test]
    fn object_count_ignores_field_errors() {
        let xml = "<annotation><filename>5.jpg</filename>\
                   <object><bndbox><xmin>ten</xmin></bndbox></object><object/></annotation>";
        let count = count_objects_str(xml, Path::new("5.xml")).expect("count");
        assert_eq!(
            count,
            ObjectCount {
                filename: Some("5.jpg".to_string()),
                objects: 2,
            }
        );

        assert!(count_objects_str("<annotation>", Path::new("6.xml")).is_err());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert!(from_annotation_xml_slice(&[0xff, 0xfe, 0x00]).is_err());
    }
}
