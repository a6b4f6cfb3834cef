use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::TempDir;
use transposex::adapters::{ContainerCodec, Document};
use transposex::config::toml_config::TomlConfig;
use transposex::{
    transpose_archive, JobConfig, LocalStorage, TransposeError, TranspositionEngine,
    TranspositionPipeline,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container>
  <rootfiles>
    <rootfile full-path="score.xml" media-type="application/vnd.recordare.musicxml+xml"/>
  </rootfiles>
</container>
"#;

const SCORE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="4.0">
  <!-- lead sheet -->
  <part-list><score-part id="P1"><part-name>Voice</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes><divisions>1</divisions><key><fifths>0</fifths></key></attributes>
      <note>
        <pitch>
          <step>C</step>
          <octave>4</octave>
        </pitch>
        <duration>1</duration>
        <lyric><text>do &amp; re</text></lyric>
      </note>
      <note>
        <pitch>
          <step>E</step>
          <octave>4</octave>
        </pitch>
        <duration>1</duration>
      </note>
      <note>
        <pitch>
          <step>G</step>
          <octave>4</octave>
        </pitch>
        <duration>1</duration>
      </note>
      <note>
        <rest/>
        <duration>1</duration>
      </note>
    </measure>
  </part>
</score-partwise>
"#;

fn write_mxl(path: &Path, entries: &[(&str, &[u8], CompressionMethod)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, data, method) in entries {
        zip.start_file(*name, SimpleFileOptions::default().compression_method(*method))
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn read_entries(path: &Path) -> Vec<(String, Vec<u8>, CompressionMethod)> {
    let data = std::fs::read(path).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        entries.push((file.name().to_string(), content, file.compression()));
    }
    entries
}

fn standard_score(dir: &TempDir) -> std::path::PathBuf {
    let input = dir.path().join("song.mxl");
    write_mxl(
        &input,
        &[
            ("mimetype", &b"application/vnd.recordare.musicxml"[..], CompressionMethod::Stored),
            ("META-INF/container.xml", MANIFEST.as_bytes(), CompressionMethod::Deflated),
            ("score.xml", SCORE.as_bytes(), CompressionMethod::Deflated),
            ("images/cover.png", &[0x89u8, 0x50, 0x4e, 0x47, 0, 1, 2, 3][..], CompressionMethod::Stored),
        ],
    );
    input
}

fn pitches(xml: &[u8]) -> Vec<String> {
    let doc = Document::parse(xml).unwrap();
    doc.note_elements()
        .into_iter()
        .filter_map(|note| doc.pitch_nodes(note))
        .filter_map(|nodes| doc.read_pitch(&nodes).ok())
        .map(|pitch| pitch.to_string())
        .collect()
}

#[tokio::test]
async fn test_triad_up_a_whole_tone() {
    let dir = TempDir::new().unwrap();
    let input = standard_score(&dir);
    let output = dir.path().join("song-up.mxl");

    let outcome = transpose_archive(input.to_str().unwrap(), 2, output.to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.entry_name.as_deref(), Some("score.xml"));
    assert_eq!(outcome.stats.notes_transposed, 3);
    assert_eq!(outcome.stats.unpitched_notes, 1);

    let entries = read_entries(&output);
    let score = &entries
        .iter()
        .find(|(name, _, _)| name == "score.xml")
        .unwrap()
        .1;
    assert_eq!(pitches(score), vec!["D4", "F#4", "A4"]);
}

#[tokio::test]
async fn test_everything_outside_pitches_is_preserved() {
    let dir = TempDir::new().unwrap();
    let input = standard_score(&dir);
    let output = dir.path().join("song-up.mxl");

    transpose_archive(input.to_str().unwrap(), 2, output.to_str().unwrap())
        .await
        .unwrap();

    let before = read_entries(&input);
    let after = read_entries(&output);

    let names: Vec<&str> = after.iter().map(|(name, _, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec!["mimetype", "META-INF/container.xml", "score.xml", "images/cover.png"]
    );

    for ((name, old, old_method), (_, new, new_method)) in before.iter().zip(after.iter()) {
        assert_eq!(old_method, new_method, "compression changed for {}", name);
        if name != "score.xml" {
            assert_eq!(old, new, "{} should be untouched", name);
        }
    }

    let expected = SCORE
        .replacen("<step>C</step>", "<step>D</step>", 1)
        .replacen(
            "<step>E</step>\n          <octave>4</octave>",
            "<step>F</step>\n          <alter>1</alter><octave>4</octave>",
            1,
        )
        .replacen("<step>G</step>", "<step>A</step>", 1);
    let score = &after[2].1;
    assert_eq!(String::from_utf8(score.clone()).unwrap(), expected);
}

#[tokio::test]
async fn test_up_then_down_restores_the_score() {
    let dir = TempDir::new().unwrap();
    let input = standard_score(&dir);
    let up = dir.path().join("up.mxl");
    let back = dir.path().join("back.mxl");

    transpose_archive(input.to_str().unwrap(), 5, up.to_str().unwrap())
        .await
        .unwrap();
    transpose_archive(up.to_str().unwrap(), -5, back.to_str().unwrap())
        .await
        .unwrap();

    let original = read_entries(&input);
    let restored = read_entries(&back);
    assert_eq!(pitches(&original[2].1), pitches(&restored[2].1));
    assert_eq!(original[2].1, restored[2].1);
}

#[tokio::test]
async fn test_archive_without_document_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("empty.mxl");
    let output = dir.path().join("empty-out.mxl");
    write_mxl(
        &input,
        &[
            ("META-INF/container.xml", &b"<container/>"[..], CompressionMethod::Deflated),
            ("notes.txt", &b"nothing here"[..], CompressionMethod::Deflated),
        ],
    );

    let err = transpose_archive(input.to_str().unwrap(), 2, output.to_str().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, TransposeError::ContainerFormat { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_not_a_zip_is_container_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("fake.mxl");
    std::fs::write(&input, b"definitely not a zip archive").unwrap();
    let output = dir.path().join("fake-out.mxl");

    let err = transpose_archive(input.to_str().unwrap(), 1, output.to_str().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, TransposeError::ContainerFormat { .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_malformed_document_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.mxl");
    let output = dir.path().join("broken-out.mxl");
    write_mxl(
        &input,
        &[("score.xml", &b"<score-partwise><part></score-partwise>"[..], CompressionMethod::Deflated)],
    );

    let err = transpose_archive(input.to_str().unwrap(), 1, output.to_str().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, TransposeError::DocumentParse { .. }));
    assert_eq!(err.exit_code(), 4);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_input_is_io_error() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("missing.mxl");
    let output = dir.path().join("out.mxl");

    let err = transpose_archive(input.to_str().unwrap(), 1, output.to_str().unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, TransposeError::Io(_)));
}

#[tokio::test]
async fn test_plain_musicxml_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("song.musicxml");
    let output = dir.path().join("song-down.musicxml");
    std::fs::write(&input, SCORE).unwrap();

    let outcome = transpose_archive(input.to_str().unwrap(), -3, output.to_str().unwrap())
        .await
        .unwrap();

    assert_eq!(outcome.entry_name, None);
    let written = std::fs::read(&output).unwrap();
    assert_eq!(pitches(&written), vec!["A3", "C#4", "E4"]);
}

#[tokio::test]
async fn test_manifest_rootfile_wins_over_entry_order() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("two.mxl");
    let output = dir.path().join("two-out.mxl");
    let decoy = "<score-partwise><part><measure><note><pitch><step>B</step><octave>2</octave></pitch></note></measure></part></score-partwise>";
    write_mxl(
        &input,
        &[
            ("META-INF/container.xml", MANIFEST.as_bytes(), CompressionMethod::Deflated),
            ("aaa-decoy.xml", decoy.as_bytes(), CompressionMethod::Deflated),
            ("score.xml", SCORE.as_bytes(), CompressionMethod::Deflated),
        ],
    );

    let outcome = transpose_archive(input.to_str().unwrap(), 1, output.to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(outcome.entry_name.as_deref(), Some("score.xml"));

    let entries = read_entries(&output);
    assert_eq!(entries[1].1, decoy.as_bytes().to_vec());
    assert_eq!(pitches(&entries[2].1), vec!["C#4", "F4", "G#4"]);
}

#[tokio::test]
async fn test_codec_extract_and_repack_on_disk() {
    let dir = TempDir::new().unwrap();
    let input = standard_score(&dir);
    let output = dir.path().join("repacked.mxl");
    let codec = ContainerCodec::default();

    let (entry, bytes) = codec.extract(&input).unwrap();
    assert_eq!(entry, "score.xml");
    assert_eq!(bytes, SCORE.as_bytes().to_vec());

    codec.repack(&input, &entry, b"<score-partwise/>", &output).unwrap();
    let entries = read_entries(&output);
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[2].1, b"<score-partwise/>".to_vec());
}

#[tokio::test]
async fn test_batch_jobs_from_toml() {
    let dir = TempDir::new().unwrap();
    let input = standard_score(&dir);
    std::env::set_var("TRANSPOSEX_IT_DIR", dir.path().to_str().unwrap());

    let config = TomlConfig::from_toml_str(
        r#"
[transpose]
interval = 12

[[jobs]]
input = "${TRANSPOSEX_IT_DIR}/song.mxl"
from_key = "C major"
"#,
    )
    .unwrap();
    std::env::remove_var("TRANSPOSEX_IT_DIR");

    let jobs: Vec<JobConfig> = config.resolve_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].input, input.to_str().unwrap());

    let job = jobs.into_iter().next().unwrap();
    let expected_output = dir.path().join("song-transposed.mxl");
    assert_eq!(job.output, expected_output.to_str().unwrap());

    let pipeline = TranspositionPipeline::new(LocalStorage::default(), job);
    let outcome = TranspositionEngine::new(pipeline).run().await.unwrap();
    assert_eq!(outcome.stats.notes_transposed, 3);

    let entries = read_entries(&expected_output);
    assert_eq!(pitches(&entries[2].1), vec!["C5", "E5", "G5"]);
}
