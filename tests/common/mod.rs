#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// One `<object>` of a VOC file: label and `xmin, ymin, xmax, ymax`.
pub type VocObject<'a> = (&'a str, [i64; 4]);

pub fn voc_xml(filename: &str, size: (i64, i64, i64), objects: &[VocObject<'_>]) -> String {
    let mut xml = format!(
        "<annotation>\n  <folder>images</folder>\n  <filename>{filename}</filename>\n  \
         <size><width>{}</width><height>{}</height><depth>{}</depth></size>\n",
        size.0, size.1, size.2
    );
    for (name, [xmin, ymin, xmax, ymax]) in objects {
        xml.push_str(&format!(
            "  <object>\n    <name>{name}</name>\n    <pose>Unspecified</pose>\n    \
             <bndbox><xmin>{xmin}</xmin><ymin>{ymin}</ymin><xmax>{xmax}</xmax><ymax>{ymax}</ymax></bndbox>\n  \
             </object>\n"
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}

pub fn write_voc(
    dir: &Path,
    file: &str,
    filename: &str,
    size: (i64, i64, i64),
    objects: &[VocObject<'_>],
) {
    fs::create_dir_all(dir).expect("create annotation dir");
    fs::write(dir.join(file), voc_xml(filename, size, objects)).expect("write voc file");
}

/// Create one file per name; each file holds its own original name so moves
/// can be traced.
pub fn write_images(dir: &Path, names: &[&str]) {
    fs::create_dir_all(dir).expect("create image dir");
    for name in names {
        fs::write(dir.join(name), name.as_bytes()).expect("write image");
    }
}

pub fn read_to_string(path: &Path) -> String {
    fs::read_to_string(path).expect("read file")
}
