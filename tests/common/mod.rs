#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// Renders one label line with a box per class.
pub fn record_line(image_url: &str, classes: &[&str]) -> String {
    let boxes: Vec<String> = classes
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let offset = i as f64 * 0.01;
            format!(
                "{{\"label\":\"{class}\",\"topX\":{},\"topY\":{},\"bottomX\":{},\"bottomY\":{}}}",
                0.1 + offset,
                0.2 + offset,
                0.3 + offset,
                0.4 + offset
            )
        })
        .collect();

    format!(
        "{{\"image_url\":\"{image_url}\",\"image_details\":{{\"format\":\"jpg\",\"width\":7168,\"height\":4561}},\"label\":[{}]}}",
        boxes.join(",")
    )
}

/// Writes a label file made of the given lines, each newline-terminated.
pub fn write_label_file(path: &Path, lines: &[String]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    let mut body = String::new();
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    fs::write(path, body).expect("write label file");
}

/// Writes a corpus of `count` images; image `i` carries classes `A`/`B`/`C`
/// in rotation, and every seventh image also carries `rare`.
pub fn write_rotating_corpus(path: &Path, prefix: &str, count: usize) {
    let classes = ["A", "B", "C"];
    let lines: Vec<String> = (0..count)
        .map(|i| {
            let mut boxes = vec![classes[i % 3], classes[(i + 1) % 3]];
            if i % 7 == 0 {
                boxes.push("rare");
            }
            record_line(&format!("{prefix}{i}.jpg"), &boxes)
        })
        .collect();
    write_label_file(path, &lines);
}
