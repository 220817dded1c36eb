//! HLS playlist conversion to MP4.
//!
//! The conversion is modelled as an export session: open the playlist as an asset,
//! pick a preset (stream copy when the codecs fit MP4, re-encode otherwise), check the
//! session can produce an MP4 container, then run `ffmpeg` and map its terminal state.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use reqwest::Client;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::download::transfer::PartialFile;
use crate::error::{Error, Result};

/// Container every converted video is written as.
pub const MP4_CONTAINER: &str = "mp4";

/// Codec families (RFC 6381 prefixes) each container accepts without re-encoding.
const CONTAINER_CODECS: &[(&str, &[&str])] = &[
    (MP4_CONTAINER, &["avc1", "avc3", "hvc1", "hev1", "mp4a", "ac-3", "ec-3", "opus"]),
    ("mov", &["avc1", "avc3", "hvc1", "hev1", "mp4a", "ac-3", "ec-3"]),
];

/// Containers the re-encoding preset can target.
const ENCODE_CONTAINERS: &[&str] = &[MP4_CONTAINER, "mov"];

/// Converts an HLS playlist into a standard container file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        playlist_url: &str,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// An opened playlist: the stream to read and the codecs it declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsAsset {
    pub stream_url: String,
    pub codecs: Vec<String>,
}

/// How the export session produces its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPreset {
    /// Stream copy, lossless.
    Passthrough,
    /// Re-encode at the highest practical quality.
    HighestQuality,
}

impl fmt::Display for ExportPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportPreset::Passthrough => write!(f, "passthrough"),
            ExportPreset::HighestQuality => write!(f, "highest quality"),
        }
    }
}

/// Terminal state reported by an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Completed,
    Cancelled,
    Failed(Option<String>),
    /// Ended in a way none of the above describes, e.g. killed by a signal.
    Unknown,
}

/// A configured export of one asset.
#[derive(Debug, Clone)]
pub struct ExportSession {
    asset: HlsAsset,
    preset: ExportPreset,
    muxers: HashSet<String>,
}

impl ExportSession {
    /// Create a session, preferring passthrough when the asset allows it.
    pub fn new(asset: HlsAsset, muxers: HashSet<String>) -> Self {
        let preset = if passthrough_available(&asset.codecs) {
            ExportPreset::Passthrough
        } else {
            ExportPreset::HighestQuality
        };

        Self {
            asset,
            preset,
            muxers,
        }
    }

    pub fn preset(&self) -> ExportPreset {
        self.preset
    }

    /// Containers this session can actually produce for its asset.
    pub fn supported_containers(&self) -> Vec<&'static str> {
        match self.preset {
            ExportPreset::Passthrough => CONTAINER_CODECS
                .iter()
                .filter(|(container, accepted)| {
                    self.muxers.contains(*container)
                        && self
                            .asset
                            .codecs
                            .iter()
                            .all(|codec| accepted.contains(&codec_family(codec)))
                })
                .map(|(container, _)| *container)
                .collect(),
            ExportPreset::HighestQuality => ENCODE_CONTAINERS
                .iter()
                .copied()
                .filter(|container| self.muxers.contains(*container))
                .collect(),
        }
    }

    /// `ffmpeg` arguments writing an MP4 to `output`.
    pub fn ffmpeg_args(&self, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-y", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(self.asset.stream_url.clone());

        let codec_args: &[&str] = match self.preset {
            ExportPreset::Passthrough => &["-c", "copy", "-bsf:a", "aac_adtstoasc"],
            ExportPreset::HighestQuality => &[
                "-c:v", "libx264", "-preset", "slow", "-crf", "18", "-c:a", "aac", "-b:a", "192k",
            ],
        };
        args.extend(codec_args.iter().map(|s| s.to_string()));

        // Moov atom up front so the file streams over the network
        args.extend(["-movflags", "+faststart", "-f", MP4_CONTAINER].map(String::from));
        args.push(output.display().to_string());
        args
    }

    /// Run the export and report how it ended.
    pub async fn export(
        &self,
        ffmpeg: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExportStatus> {
        let child = Command::new(ffmpeg)
            .args(self.ffmpeg_args(output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FFmpegNotFound
                } else {
                    Error::FFmpeg(format!("Failed to run ffmpeg: {}", e))
                }
            })?;

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            _ = cancel.cancelled() => return Ok(ExportStatus::Cancelled),
            output = child.wait_with_output() => output?,
        };

        if output.status.success() {
            return Ok(ExportStatus::Completed);
        }

        match output.status.code() {
            Some(code) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let message = stderr
                    .lines()
                    .rev()
                    .find(|line| !line.trim().is_empty())
                    .map(|line| format!("ffmpeg exited with status {}: {}", code, line.trim()));
                Ok(ExportStatus::Failed(message))
            }
            None => Ok(ExportStatus::Unknown),
        }
    }
}

/// Map an export's terminal state to the task result.
pub fn map_export_status(status: ExportStatus) -> Result<()> {
    match status {
        ExportStatus::Completed => Ok(()),
        ExportStatus::Cancelled => Err(Error::Cancelled),
        ExportStatus::Failed(message) => Err(Error::Transcode(
            message.unwrap_or_else(|| "Export failed".to_string()),
        )),
        ExportStatus::Unknown => Err(Error::Transcode("unexpected export state".to_string())),
    }
}

/// [`Transcoder`] backed by the `ffmpeg` binary.
pub struct FfmpegTranscoder {
    client: Client,
    ffmpeg: PathBuf,
    muxers: OnceCell<HashSet<String>>,
}

impl FfmpegTranscoder {
    pub fn new(client: Client) -> Self {
        Self::with_binary(client, PathBuf::from("ffmpeg"))
    }

    pub fn with_binary(client: Client, ffmpeg: PathBuf) -> Self {
        Self {
            client,
            ffmpeg,
            muxers: OnceCell::new(),
        }
    }

    /// Fetch and parse the playlist.
    async fn open_asset(&self, playlist_url: &str) -> Result<HlsAsset> {
        let response = self.client.get(playlist_url).send().await?;
        if !response.status().is_success() {
            return Err(Error::M3U8(format!(
                "Failed to fetch playlist: HTTP {}",
                response.status()
            )));
        }

        let content = response
            .bytes()
            .await
            .map_err(|e| Error::M3U8(format!("Failed to read playlist: {}", e)))?;

        asset_from_playlist(playlist_url, &content)
    }

    /// Muxers the local ffmpeg build can write (queried once).
    async fn muxers(&self) -> Result<&HashSet<String>> {
        self.muxers
            .get_or_try_init(|| async {
                let output = Command::new(&self.ffmpeg)
                    .args(["-hide_banner", "-muxers"])
                    .stdin(Stdio::null())
                    .output()
                    .await
                    .map_err(|e| {
                        if e.kind() == std::io::ErrorKind::NotFound {
                            Error::FFmpegNotFound
                        } else {
                            Error::FFmpeg(format!("Failed to run ffmpeg: {}", e))
                        }
                    })?;

                Ok::<_, Error>(parse_muxers(&String::from_utf8_lossy(&output.stdout)))
            })
            .await
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        playlist_url: &str,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<()> {
        remove_stale_output(destination).await?;

        let asset = self.open_asset(playlist_url).await?;
        let session = ExportSession::new(asset, self.muxers().await?.clone());

        if !session.supported_containers().contains(&MP4_CONTAINER) {
            return Err(Error::Transcode(format!(
                "Video cannot be exported as {} with the {} preset",
                MP4_CONTAINER,
                session.preset()
            )));
        }

        tracing::debug!(
            "Exporting {} with {} preset",
            destination.display(),
            session.preset()
        );

        let partial = PartialFile::new(destination);
        let status = session.export(&self.ffmpeg, partial.path(), cancel).await?;
        map_export_status(status)?;

        partial.commit(destination).await
    }
}

/// Build an asset from playlist content.
///
/// A master playlist resolves to its highest-bandwidth variant.
pub fn asset_from_playlist(playlist_url: &str, content: &[u8]) -> Result<HlsAsset> {
    let playlist = m3u8_rs::parse_playlist_res(content)
        .map_err(|e| Error::M3U8(format!("Failed to parse playlist: {:?}", e)))?;

    match playlist {
        m3u8_rs::Playlist::MasterPlaylist(master) => {
            // Select highest quality variant
            let variant = master
                .variants
                .iter()
                .filter(|v| !v.is_i_frame)
                .max_by_key(|v| v.bandwidth)
                .ok_or_else(|| Error::M3U8("No variants in master playlist".into()))?;

            let codecs = variant
                .codecs
                .as_deref()
                .map(|c| {
                    c.split(',')
                        .map(|codec| codec.trim().to_string())
                        .filter(|codec| !codec.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            Ok(HlsAsset {
                stream_url: resolve_url(playlist_url, &variant.uri)?,
                codecs,
            })
        }
        m3u8_rs::Playlist::MediaPlaylist(media) => {
            if media.segments.is_empty() {
                return Err(Error::M3U8("No segments found in playlist".into()));
            }
            Ok(HlsAsset {
                stream_url: playlist_url.to_string(),
                codecs: Vec::new(),
            })
        }
    }
}

/// Passthrough is possible when every declared codec fits MP4. Unknown codecs are
/// assumed to fit; the container check and the export itself catch the rest.
fn passthrough_available(codecs: &[String]) -> bool {
    let accepted = CONTAINER_CODECS
        .iter()
        .find(|(container, _)| *container == MP4_CONTAINER)
        .map(|(_, accepted)| *accepted)
        .unwrap_or(&[]);

    codecs
        .iter()
        .all(|codec| accepted.contains(&codec_family(codec)))
}

/// `avc1.640028` → `avc1`.
fn codec_family(codec: &str) -> &str {
    codec.split('.').next().unwrap_or(codec)
}

/// Parse `ffmpeg -muxers` output into muxer names.
///
/// The legend ends with a rule of dashes, `--` before ffmpeg 6.1 and `---` after.
pub fn parse_muxers(output: &str) -> HashSet<String> {
    output
        .lines()
        .skip_while(|line| !is_legend_rule(line))
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let flags = parts.next()?;
            let names = parts.next()?;
            flags.contains('E').then_some(names)
        })
        .flat_map(|names| names.split(',').map(String::from))
        .collect()
}

fn is_legend_rule(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c == '-')
}

/// Remove output left behind by an earlier attempt.
async fn remove_stale_output(destination: &Path) -> Result<()> {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => {
            tracing::debug!("Removed stale output {}", destination.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Resolve a potentially relative URL against a base URL.
fn resolve_url(base: &str, path: &str) -> Result<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }

    let base_url = url::Url::parse(base)?;
    let resolved = base_url.join(path)?;
    Ok(resolved.to_string())
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;

    const MASTER: &str = "#EXTM3U
#EXT-X-VERSION:6
#EXT-X-INDEPENDENT-SEGMENTS
#EXT-X-STREAM-INF:AVERAGE-BANDWIDTH=400000,BANDWIDTH=500000,RESOLUTION=480x270,CODECS=\"avc1.4D401E,mp4a.40.2\"
/ext_tw_video/1/pu/pl/avc1/480x270/low.m3u8
#EXT-X-STREAM-INF:AVERAGE-BANDWIDTH=2000000,BANDWIDTH=2500000,RESOLUTION=1280x720,CODECS=\"avc1.64001F,mp4a.40.2\"
/ext_tw_video/1/pu/pl/avc1/1280x720/high.m3u8
";

    const MEDIA: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-TARGETDURATION:4
#EXT-X-MEDIA-SEQUENCE:0
#EXTINF:4.0,
seg0.ts
#EXTINF:4.0,
seg1.ts
#EXT-X-ENDLIST
";

    const MUXERS: &str = "Muxers:
 D. = Demuxing supported
 .E = Muxing supported
 --
  E matroska        Matroska
  E mov             QuickTime / MOV
  E mp4             MP4 (MPEG-4 Part 14)
 D  hls             Apple HTTP Live Streaming
";

    const MUXERS_DEVICE_COLUMN: &str = "Muxers:
 D.. = Demuxing supported
 .E. = Muxing supported
 ..d = Is a device
 ---
  E  matroska        Matroska
  E  mov             QuickTime / MOV
  E  mp4             MP4 (MPEG-4 Part 14)
 D   hls             Apple HTTP Live Streaming
  Ed alsa            ALSA audio output
";

    fn muxers() -> HashSet<String> {
        parse_muxers(MUXERS)
    }

    #[test]
    fn test_master_playlist_picks_highest_bandwidth() {
        let asset = asset_from_playlist(
            "https://video.twimg.com/ext_tw_video/1/pu/pl/master.m3u8?tag=12",
            MASTER.as_bytes(),
        )
        .unwrap();

        assert_eq!(
            asset.stream_url,
            "https://video.twimg.com/ext_tw_video/1/pu/pl/avc1/1280x720/high.m3u8"
        );
        assert_eq!(asset.codecs, vec!["avc1.64001F", "mp4a.40.2"]);
    }

    #[test]
    fn test_media_playlist_is_its_own_stream() {
        let url = "https://video.twimg.com/pl/media.m3u8";
        let asset = asset_from_playlist(url, MEDIA.as_bytes()).unwrap();
        assert_eq!(asset.stream_url, url);
        assert!(asset.codecs.is_empty());
    }

    #[test]
    fn test_garbage_playlist_is_error() {
        let result = asset_from_playlist("https://x/a.m3u8", b"<html>nope</html>");
        assert!(matches!(result, Err(Error::M3U8(_))));
    }

    #[test]
    fn test_parse_muxers() {
        let names = muxers();
        assert!(names.contains("mp4"));
        assert!(names.contains("mov"));
        assert!(names.contains("matroska"));
        assert!(!names.contains("hls"));
    }

    #[test]
    fn test_parse_muxers_with_device_column() {
        let names = parse_muxers(MUXERS_DEVICE_COLUMN);
        assert!(names.contains("mp4"));
        assert!(names.contains("mov"));
        assert!(names.contains("alsa"));
        assert!(!names.contains("hls"));
        assert!(!names.iter().any(|name| name.starts_with('=')));

        let asset = HlsAsset {
            stream_url: "https://x/a.m3u8".into(),
            codecs: vec!["avc1.64001F".into(), "mp4a.40.2".into()],
        };
        let session = ExportSession::new(asset, names);
        assert!(session.supported_containers().contains(&MP4_CONTAINER));
    }

    #[test]
    fn test_parse_muxers_without_legend_is_empty() {
        assert!(parse_muxers("ffmpeg: unrecognized option").is_empty());
    }

    #[test]
    fn test_session_prefers_passthrough() {
        let asset = HlsAsset {
            stream_url: "https://x/a.m3u8".into(),
            codecs: vec!["avc1.64001F".into(), "mp4a.40.2".into()],
        };
        let session = ExportSession::new(asset, muxers());
        assert_eq!(session.preset(), ExportPreset::Passthrough);
        assert!(session.supported_containers().contains(&MP4_CONTAINER));

        let args = session.ffmpeg_args(Path::new("/tmp/out.part"));
        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
        assert!(args.windows(2).any(|w| w == ["-movflags", "+faststart"]));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out.part"));
    }

    #[test]
    fn test_session_falls_back_to_highest_quality() {
        let asset = HlsAsset {
            stream_url: "https://x/a.m3u8".into(),
            codecs: vec!["vp09.00.10.08".into(), "mp4a.40.2".into()],
        };
        let session = ExportSession::new(asset, muxers());
        assert_eq!(session.preset(), ExportPreset::HighestQuality);
        assert_eq!(session.supported_containers(), vec!["mp4", "mov"]);
        assert!(session
            .ffmpeg_args(Path::new("out"))
            .windows(2)
            .any(|w| w == ["-c:v", "libx264"]));
    }

    #[test]
    fn test_no_mp4_muxer_means_unsupported() {
        let asset = HlsAsset {
            stream_url: "https://x/a.m3u8".into(),
            codecs: vec![],
        };
        let only_mkv: HashSet<String> = ["matroska".to_string()].into_iter().collect();
        let session = ExportSession::new(asset, only_mkv);
        assert!(!session.supported_containers().contains(&MP4_CONTAINER));
    }

    #[test]
    fn test_map_export_status() {
        assert!(map_export_status(ExportStatus::Completed).is_ok());
        assert!(matches!(
            map_export_status(ExportStatus::Cancelled),
            Err(Error::Cancelled)
        ));
        assert_eq!(
            map_export_status(ExportStatus::Failed(None))
                .unwrap_err()
                .to_string(),
            "Export failed"
        );
        assert_eq!(
            map_export_status(ExportStatus::Failed(Some("bad input".into())))
                .unwrap_err()
                .to_string(),
            "bad input"
        );
        assert_eq!(
            map_export_status(ExportStatus::Unknown)
                .unwrap_err()
                .to_string(),
            "unexpected export state"
        );
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://a.com/x/master.m3u8", "v/low.m3u8").unwrap(),
            "https://a.com/x/v/low.m3u8"
        );
        assert_eq!(
            resolve_url("https://a.com/x/master.m3u8", "https://b.com/y.m3u8").unwrap(),
            "https://b.com/y.m3u8"
        );
    }

    #[tokio::test]
    async fn test_remove_stale_output() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("v.mp4");
        assert_ok!(remove_stale_output(&dest).await);

        tokio::fs::write(&dest, b"stale").await.unwrap();
        assert_ok!(remove_stale_output(&dest).await);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_binary() {
        let transcoder = FfmpegTranscoder::with_binary(
            Client::new(),
            PathBuf::from("/nonexistent/ffmpeg-binary"),
        );
        assert!(matches!(
            transcoder.muxers().await,
            Err(Error::FFmpegNotFound)
        ));
    }
}
