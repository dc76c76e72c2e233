use async_trait::async_trait;
use writable_stream::{UnderlyingSink, WritableStreamDefaultController};

/// A sink that rejects the first `write`, and succeeds on every one after.
pub struct FailingSink {
    failed: bool,
}

impl FailingSink {
    pub fn new() -> Self {
        Self { failed: false }
    }
}

impl Default for FailingSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl<W> UnderlyingSink<W, String> for FailingSink {
    async fn write(
        &mut self,
        _chunk: W,
        _controller: &WritableStreamDefaultController<W, String>,
    ) -> Result<(), String> {
        if !self.failed {
            self.failed = true;
            Err("intentional error".to_string())
        } else {
            Ok(())
        }
    }
}
