use ripple_core::{Child, NodeId, Reconciler, ReconcilerOptions};

use crate::{dom::DomRoot, error::WebError, host::WebHost};

/// Builder for [`WebApp`].
#[derive(Debug, Clone)]
pub struct WebAppBuilder {
    root_id: Option<String>,
    options: ReconcilerOptions,
    panic_hook: bool,
}

impl Default for WebAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebAppBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root_id: None,
            options: ReconcilerOptions::default(),
            panic_hook: true,
        }
    }

    /// Sets the DOM element identifier that should host the application.
    #[must_use]
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = Some(id.into());
        self
    }

    /// Sets the reconciler options.
    #[must_use]
    pub fn options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    /// Controls whether panics are forwarded to the browser console.
    #[must_use]
    pub const fn panic_hook(mut self, install: bool) -> Self {
        self.panic_hook = install;
        self
    }

    /// Finalises the builder and creates a [`WebApp`].
    ///
    /// The mounting element is emptied.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM root element cannot be found or initialized.
    pub fn build(self) -> Result<WebApp, WebError> {
        if self.panic_hook {
            console_error_panic_hook::set_once();
        }
        let root = DomRoot::new(self.root_id.as_deref())?;
        root.clear()?;

        let host = WebHost::new(root.document().clone());
        let container = host.adopt(root.element());
        let reconciler = Reconciler::builder(host.clone())
            .options(self.options)
            .build();
        tracing::debug!(%container, "web app ready");

        Ok(WebApp {
            root,
            host,
            reconciler,
            container,
            mounted: None,
        })
    }
}

/// Entry point for running Ripple inside the browser.
///
/// The first [`WebApp::render`] mounts a tree into the root element; later
/// calls patch the mounted tree.
#[derive(Debug)]
pub struct WebApp {
    root: DomRoot,
    host: WebHost,
    reconciler: Reconciler<WebHost>,
    container: NodeId,
    mounted: Option<NodeId>,
}

impl WebApp {
    /// Creates a [`WebApp`] using the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the DOM root element cannot be found or initialized.
    pub fn new() -> Result<Self, WebError> {
        WebAppBuilder::new().build()
    }

    /// Starts configuring a [`WebApp`].
    #[must_use]
    pub fn builder() -> WebAppBuilder {
        WebAppBuilder::new()
    }

    /// Mounts `tree`, or patches the tree mounted by a previous call.
    ///
    /// Returns the live root node of the application.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::Render`] if the tree is malformed or a render pass
    /// is already running.
    pub fn render(&mut self, tree: &Child) -> Result<NodeId, WebError> {
        let node = match self.mounted {
            Some(node) => self.reconciler.patch_in(node, tree, Some(self.container))?,
            None => self.reconciler.render(tree, Some(self.container))?,
        };
        self.mounted = Some(node);
        Ok(node)
    }

    /// The live root node of the application, once rendered.
    #[must_use]
    pub const fn mounted(&self) -> Option<NodeId> {
        self.mounted
    }

    /// The reconciler driving this app, e.g. to look up component handles.
    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler<WebHost> {
        &self.reconciler
    }

    /// The DOM host.
    #[must_use]
    pub const fn host(&self) -> &WebHost {
        &self.host
    }

    /// The mounting element.
    #[must_use]
    pub const fn root(&self) -> &DomRoot {
        &self.root
    }
}
