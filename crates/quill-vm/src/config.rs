//! VM configuration.

/// Limits and service settings fixed when a `Vm` is created.
#[derive(Clone, Debug)]
pub struct VmConfig {
    /// Max call depth before `StackOverflow`.
    pub max_call_depth: usize,
    /// Operand stack slots reserved up front.
    pub initial_stack: usize,
    /// Seed for the random source; `None` seeds from the environment.
    pub random_seed: Option<u64>,
    /// Compiled patterns kept by the regex cache.
    pub regex_cache_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 200,
            initial_stack: 1024,
            random_seed: None,
            regex_cache_size: 64,
        }
    }
}

impl VmConfig {
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn with_initial_stack(mut self, slots: usize) -> Self {
        self.initial_stack = slots;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_regex_cache_size(mut self, size: usize) -> Self {
        self.regex_cache_size = size;
        self
    }
}
