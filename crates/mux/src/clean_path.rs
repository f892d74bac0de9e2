/// Returns the canonical form of a request path.
///
/// Repeated slashes collapse into one, `.` segments are dropped and `..`
/// removes the segment before it (never climbing above the root). The result
/// always starts with `/` and keeps the trailing slash of the input.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }

    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if cleaned.is_empty() || trailing {
        cleaned.push('/');
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::clean_path;

    #[test]
    fn cleans_paths() {
        let cases = [
            ("", "/"),
            ("/", "/"),
            ("abc", "/abc"),
            ("/abc/", "/abc/"),
            ("//a//b", "/a/b"),
            ("/a/./b/", "/a/b/"),
            ("/a/b/..", "/a/"),
            ("/a/../../b", "/b"),
            ("/../..", "/"),
            ("/a/b/../c/./d", "/a/c/d"),
        ];

        for (input, expected) in cases {
            assert_eq!(clean_path(input), expected, "clean_path({input:?})");
        }
    }
}
