use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use pretty_assertions::assert_eq;
use stream_engine::{DecodeMiss, ObfuscationDecoder};

const URL: &str = "https://cdn.example.net/live/espn/index.m3u8?token=a1b2";

/// Player script hiding `url` with key `first + second`, pairs emitted in
/// the given index order.
fn obfuscate(url: &str, first: i64, second: i64, order: &[usize]) -> String {
    let key = first + second;
    let pairs: Vec<String> = url
        .chars()
        .enumerate()
        .map(|(index, ch)| {
            let chunk = STANDARD.encode(format!("{}", ch as i64 + key));
            format!("[{index},\"{chunk}\"]")
        })
        .collect();
    let arranged: Vec<&str> = order.iter().map(|&index| pairs[index].as_str()).collect();
    format!(
        "<script>\nvar parts = [{}];\nfunction k1(){{ return {first}; }}\nfunction k2() {{ return {second}; }}\n</script>",
        arranged.join(",")
    )
}

fn identity(len: usize) -> Vec<usize> {
    (0..len).collect()
}

#[test]
fn recovers_the_hidden_manifest() {
    let markup = obfuscate(URL, 11_000, 523, &identity(URL.len()));
    assert_eq!(ObfuscationDecoder::new().decode(&markup), Some(URL.to_string()));
}

#[test]
fn pair_order_does_not_matter() {
    let len = URL.len();
    let reversed: Vec<usize> = (0..len).rev().collect();
    let rotated: Vec<usize> = (0..len).map(|index| (index + 17) % len).collect();
    let interleaved: Vec<usize> = (0..len).step_by(2).chain((1..len).step_by(2)).collect();

    let decoder = ObfuscationDecoder::new();
    for order in [reversed, rotated, interleaved] {
        let markup = obfuscate(URL, 9_000, 77, &order);
        assert_eq!(decoder.decode(&markup), Some(URL.to_string()));
    }
}

#[test]
fn missing_key_functions_decode_nothing() {
    let markup = obfuscate(URL, 100, 200, &identity(URL.len()));
    let without_keys = markup
        .lines()
        .filter(|line| !line.starts_with("function"))
        .collect::<Vec<_>>()
        .join("\n");

    let decoder = ObfuscationDecoder::new();
    assert_eq!(decoder.try_decode(&without_keys), Err(DecodeMiss::MissingKeyFunctions));
    assert_eq!(decoder.decode(&without_keys), None);
}

#[test]
fn markup_without_pairs_is_a_miss() {
    let decoder = ObfuscationDecoder::new();
    assert_eq!(decoder.try_decode("<html><body>nothing</body></html>"), Err(DecodeMiss::NoArray));
    assert_eq!(decoder.try_decode(""), Err(DecodeMiss::NoArray));
}

#[test]
fn decoded_text_must_be_a_manifest_url() {
    let not_http = "ftp://cdn.example/index.m3u8";
    let markup = obfuscate(not_http, 40, 2, &identity(not_http.len()));
    assert_eq!(
        ObfuscationDecoder::new().try_decode(&markup),
        Err(DecodeMiss::NotAManifest(not_http.to_string()))
    );

    let no_manifest = "https://cdn.example/video.mp4";
    let markup = obfuscate(no_manifest, 40, 2, &identity(no_manifest.len()));
    assert_eq!(ObfuscationDecoder::new().decode(&markup), None);
}

#[test]
fn named_array_ignores_other_arrays() {
    let decoy = "var other = [[0,\"MTA0\"]];\n";
    let markup = format!("{decoy}{}", obfuscate(URL, 500, 500, &identity(URL.len())));

    assert_eq!(ObfuscationDecoder::with_array_name("parts").decode(&markup), Some(URL.to_string()));
    assert_eq!(ObfuscationDecoder::with_array_name("missing").try_decode(&markup), Err(DecodeMiss::NoArray));
}

#[test]
fn one_pair_per_line_keeps_the_last_fragment() {
    let url = "https://cdn.example/hls/x.m3u8";
    let key = 250 + 50;
    let lines: Vec<String> = url
        .chars()
        .enumerate()
        .map(|(index, ch)| format!("    [{index}, \"{}\"]", STANDARD.encode(format!("{}", ch as i64 + key))))
        .collect();
    let markup = format!(
        "<script>\nvar parts = [\n{}\n];\nfunction k1() {{ return 250; }}\nfunction k2() {{ return 50; }}\n</script>",
        lines.join(",\n")
    );

    assert_eq!(ObfuscationDecoder::new().try_decode(&markup), Ok(url.to_string()));
    assert_eq!(ObfuscationDecoder::with_array_name("parts").decode(&markup), Some(url.to_string()));
}
