use super::{ExplanationService, FetchedMedia, MediaFetcher, VideoGenerationService};
use crate::models::{GenerationRequest, Operation, VisualExplanation};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Scripted video backend.
///
/// `submit` returns the first scripted operation and each status check returns
/// the next one. The last operation repeats once the script runs out.
#[derive(Clone)]
pub struct MockVideoClient {
    operations: Arc<Mutex<Vec<Operation>>>,
    submit_error: Arc<Mutex<Option<String>>>,
    returns_operation: Arc<Mutex<bool>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    submit_count: Arc<Mutex<usize>>,
    check_count: Arc<Mutex<usize>>,
}

impl MockVideoClient {
    pub fn new() -> Self {
        Self {
            operations: Arc::new(Mutex::new(Vec::new())),
            submit_error: Arc::new(Mutex::new(None)),
            returns_operation: Arc::new(Mutex::new(true)),
            requests: Arc::new(Mutex::new(Vec::new())),
            submit_count: Arc::new(Mutex::new(0)),
            check_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_operation(self, operation: Operation) -> Self {
        self.operations.lock().unwrap().push(operation);
        self
    }

    /// Make `submit` succeed without handing back an operation.
    pub fn without_operation(self) -> Self {
        *self.returns_operation.lock().unwrap() = false;
        self
    }

    pub fn with_submit_error(self, message: &str) -> Self {
        *self.submit_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_submit_count(&self) -> usize {
        *self.submit_count.lock().unwrap()
    }

    pub fn get_check_count(&self) -> usize {
        *self.check_count.lock().unwrap()
    }

    pub fn submitted_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn scripted(&self, index: usize) -> Operation {
        let operations = self.operations.lock().unwrap();
        match operations.get(index).or(operations.last()) {
            Some(operation) => operation.clone(),
            None => Operation::succeeded("operations/mock", Vec::new()),
        }
    }
}

impl Default for MockVideoClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoGenerationService for MockVideoClient {
    async fn submit(&self, request: &GenerationRequest) -> Result<Option<Operation>> {
        *self.submit_count.lock().unwrap() += 1;
        self.requests.lock().unwrap().push(request.clone());

        if let Some(message) = self.submit_error.lock().unwrap().clone() {
            return Err(Error::AiProvider(message));
        }
        if !*self.returns_operation.lock().unwrap() {
            return Ok(None);
        }
        Ok(Some(self.scripted(0)))
    }

    async fn check_operation(&self, _operation: &Operation) -> Result<Operation> {
        let mut count = self.check_count.lock().unwrap();
        *count += 1;
        let index = *count;
        drop(count);

        Ok(self.scripted(index))
    }
}

/// Media fetcher that records requested URLs and replays canned responses.
#[derive(Clone)]
pub struct MockMediaFetcher {
    responses: Arc<Mutex<Vec<FetchedMedia>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl MockMediaFetcher {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, response: FetchedMedia) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Default for MockMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaFetcher for MockMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let mut urls = self.urls.lock().unwrap();
        urls.push(url.to_string());
        let count = urls.len();
        drop(urls);

        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Smallest plausible MP4: a bare `ftyp` box
            Ok(FetchedMedia::ok(vec![
                0x00, 0x00, 0x00, 0x10, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm', 0x00,
                0x00, 0x02, 0x00,
            ]))
        } else {
            let index = (count - 1) % responses.len();
            Ok(responses[index].clone())
        }
    }
}

#[derive(Clone)]
pub struct MockExplanationClient {
    response: Arc<Mutex<Option<VisualExplanation>>>,
    error: Arc<Mutex<Option<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockExplanationClient {
    pub fn new() -> Self {
        Self {
            response: Arc::new(Mutex::new(None)),
            error: Arc::new(Mutex::new(None)),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_response(self, response: VisualExplanation) -> Self {
        *self.response.lock().unwrap() = Some(response);
        self
    }

    pub fn with_error(self, message: &str) -> Self {
        *self.error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockExplanationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExplanationService for MockExplanationClient {
    async fn explain(&self, concept: &str) -> Result<VisualExplanation> {
        *self.call_count.lock().unwrap() += 1;

        if let Some(message) = self.error.lock().unwrap().clone() {
            return Err(Error::AiProvider(message));
        }

        let response = self.response.lock().unwrap().clone();
        Ok(response.unwrap_or_else(|| VisualExplanation {
            title: format!("Understanding {}", concept),
            explanation: format!("A step-by-step look at {}.", concept),
            image_prompt: format!("An animated diagram of {}", concept),
        }))
    }
}
