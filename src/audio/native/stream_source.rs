use futures_util::StreamExt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// How far the download may run ahead of the decoder.
const READ_AHEAD_LIMIT: usize = 8 * 1024 * 1024;

#[derive(Default)]
struct Buffer {
    data: Vec<u8>,
    position: usize,
    finished: bool,
    error: Option<String>,
}

struct Shared {
    buffer: Mutex<Buffer>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Buffer>) -> MutexGuard<'a, Buffer> {
        self.ready.wait(guard).unwrap_or_else(|p| p.into_inner())
    }
}

/// Reader half of a progressive download. Every downloaded byte is kept so
/// the decoder can seek backwards.
pub struct HttpStreamSource {
    shared: Arc<Shared>,
}

/// Writer half, fed by [`download`].
pub struct StreamWriter {
    shared: Arc<Shared>,
}

impl HttpStreamSource {
    pub fn new() -> (Self, StreamWriter) {
        let shared = Arc::new(Shared {
            buffer: Mutex::new(Buffer {
                data: Vec::with_capacity(1024 * 1024),
                ..Buffer::default()
            }),
            ready: Condvar::new(),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            StreamWriter { shared },
        )
    }
}

impl Read for HttpStreamSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.shared.lock();
        while state.position >= state.data.len() && !state.finished && state.error.is_none() {
            state = self.shared.wait(state);
        }

        if let Some(err) = &state.error {
            return Err(io::Error::other(err.clone()));
        }

        let available = state.data.len().saturating_sub(state.position);
        let count = buf.len().min(available);
        let start = state.position;
        buf[..count].copy_from_slice(&state.data[start..start + count]);
        state.position += count;
        self.shared.ready.notify_all();
        Ok(count)
    }
}

impl Seek for HttpStreamSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut state = self.shared.lock();
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => state.position as i64 + offset,
            SeekFrom::End(offset) => state.data.len() as i64 + offset,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }
        state.position = target as usize;
        self.shared.ready.notify_all();
        Ok(target as u64)
    }
}

impl symphonia::core::io::MediaSource for HttpStreamSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        let state = self.shared.lock();
        state.finished.then_some(state.data.len() as u64)
    }
}

impl StreamWriter {
    /// Returns false once the reader side is gone or the stream is closed.
    pub fn write_bytes(&self, bytes: &[u8]) -> bool {
        let mut state = self.shared.lock();
        while state.data.len().saturating_sub(state.position) >= READ_AHEAD_LIMIT
            && !state.finished
            && Arc::strong_count(&self.shared) > 1
        {
            state = self.shared.wait(state);
        }
        if state.finished || Arc::strong_count(&self.shared) == 1 {
            return false;
        }
        state.data.extend_from_slice(bytes);
        self.shared.ready.notify_all();
        true
    }

    pub fn finish(&self) {
        self.shared.lock().finished = true;
        self.shared.ready.notify_all();
    }

    pub fn fail(&self, error: String) {
        let mut state = self.shared.lock();
        state.error = Some(error);
        state.finished = true;
        self.shared.ready.notify_all();
    }
}

impl Drop for HttpStreamSource {
    fn drop(&mut self) {
        self.shared.lock().finished = true;
        self.shared.ready.notify_all();
    }
}

/// Stream `url` into `writer` until done, failed, or the reader goes away.
pub async fn download(http: reqwest::Client, url: String, writer: StreamWriter) {
    log::info!("[download] {}", &url[..url.len().min(100)]);
    let response = match http.get(&url).send().await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("[download] request failed: {}", e);
            writer.fail(format!("request failed: {}", e));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        log::warn!("[download] HTTP {}", status);
        writer.fail(format!("HTTP {}", status));
        return;
    }

    let mut total = 0usize;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                total += bytes.len();
                if !writer.write_bytes(&bytes) {
                    log::debug!("[download] reader closed after {} bytes", total);
                    return;
                }
            }
            Err(e) => {
                log::warn!("[download] stream error after {} bytes: {}", total, e);
                writer.fail(format!("stream error: {}", e));
                return;
            }
        }
    }
    log::info!("[download] complete, {} bytes", total);
    writer.finish();
}
