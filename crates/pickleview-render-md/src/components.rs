//! The component registry.
//!
//! Every piece of the report is drawn by a [`Renderer`] for one kind of
//! props. [`Components`] holds one renderer per kind, built once with the
//! defaults from [`crate::defaults`] and any overrides a caller supplies.
//! Components reach each other through the [`RenderContext`], so replacing
//! one (say the status icon) changes it everywhere it is drawn.

use pickleview_config::ReportConfig;
use pickleview_ports::HookExecution;
use pickleview_query::{ResolvedStep, StepStatus};
use pickleview_sanitize::SanitizerSchema;
use pickleview_schema::TestStepResultStatus;
use pickleview_schema::execution::Attachment;
use pickleview_schema::gherkin::{DataTable, DocString, Examples, Tag};

use crate::defaults;

/// Draws `P` as Markdown, appending to `out`.
pub trait Renderer<P: ?Sized>: Send + Sync {
    fn render(&self, props: &P, cx: &RenderContext<'_>, out: &mut String);
}

/// Everything a component may consult besides its props.
#[derive(Clone, Copy)]
pub struct RenderContext<'c> {
    pub components: &'c Components,
    pub config: &'c ReportConfig,
    pub schema: &'c SanitizerSchema,
}

impl<'c> RenderContext<'c> {
    pub fn new(
        components: &'c Components,
        config: &'c ReportConfig,
        schema: &'c SanitizerSchema,
    ) -> Self {
        Self {
            components,
            config,
            schema,
        }
    }

    /// Render `props` with `renderer` into a fresh string.
    pub fn render_to_string<P: ?Sized>(&self, renderer: &dyn Renderer<P>, props: &P) -> String {
        let mut out = String::new();
        renderer.render(props, self, &mut out);
        out
    }
}

pub struct GherkinStepProps<'a> {
    pub step: ResolvedStep<'a>,
    pub status: StepStatus<'a>,
}

pub struct ExamplesProps<'a> {
    pub examples: &'a Examples,
    /// Worst status of each body row's pickle, in row order.
    pub row_statuses: Vec<TestStepResultStatus>,
    /// Heading level for the examples name.
    pub level: usize,
}

type StepRenderer = Box<dyn for<'a> Renderer<GherkinStepProps<'a>>>;
type ExamplesRenderer = Box<dyn for<'a> Renderer<ExamplesProps<'a>>>;
type HookRenderer = Box<dyn for<'a> Renderer<HookExecution<'a>>>;

/// One renderer per component kind.
pub struct Components {
    gherkin_step: StepRenderer,
    status_icon: Box<dyn Renderer<TestStepResultStatus>>,
    examples: ExamplesRenderer,
    tags: Box<dyn Renderer<[Tag]>>,
    description: Box<dyn Renderer<str>>,
    data_table: Box<dyn Renderer<DataTable>>,
    doc_string: Box<dyn Renderer<DocString>>,
    error_message: Box<dyn Renderer<str>>,
    attachment: Box<dyn Renderer<Attachment>>,
    hook: HookRenderer,
}

impl Components {
    pub fn builder() -> ComponentsBuilder {
        ComponentsBuilder::default()
    }

    pub fn gherkin_step(&self) -> &dyn for<'a> Renderer<GherkinStepProps<'a>> {
        self.gherkin_step.as_ref()
    }

    pub fn status_icon(&self) -> &dyn Renderer<TestStepResultStatus> {
        self.status_icon.as_ref()
    }

    pub fn examples(&self) -> &dyn for<'a> Renderer<ExamplesProps<'a>> {
        self.examples.as_ref()
    }

    pub fn tags(&self) -> &dyn Renderer<[Tag]> {
        self.tags.as_ref()
    }

    pub fn description(&self) -> &dyn Renderer<str> {
        self.description.as_ref()
    }

    pub fn data_table(&self) -> &dyn Renderer<DataTable> {
        self.data_table.as_ref()
    }

    pub fn doc_string(&self) -> &dyn Renderer<DocString> {
        self.doc_string.as_ref()
    }

    pub fn error_message(&self) -> &dyn Renderer<str> {
        self.error_message.as_ref()
    }

    pub fn attachment(&self) -> &dyn Renderer<Attachment> {
        self.attachment.as_ref()
    }

    pub fn hook(&self) -> &dyn for<'a> Renderer<HookExecution<'a>> {
        self.hook.as_ref()
    }
}

impl Default for Components {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl std::fmt::Debug for Components {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Components").finish_non_exhaustive()
    }
}

/// Collects overrides; anything left unset gets the default component.
#[derive(Default)]
pub struct ComponentsBuilder {
    gherkin_step: Option<StepRenderer>,
    status_icon: Option<Box<dyn Renderer<TestStepResultStatus>>>,
    examples: Option<ExamplesRenderer>,
    tags: Option<Box<dyn Renderer<[Tag]>>>,
    description: Option<Box<dyn Renderer<str>>>,
    data_table: Option<Box<dyn Renderer<DataTable>>>,
    doc_string: Option<Box<dyn Renderer<DocString>>>,
    error_message: Option<Box<dyn Renderer<str>>>,
    attachment: Option<Box<dyn Renderer<Attachment>>>,
    hook: Option<HookRenderer>,
}

impl ComponentsBuilder {
    pub fn gherkin_step(
        mut self,
        renderer: impl for<'a> Renderer<GherkinStepProps<'a>> + 'static,
    ) -> Self {
        self.gherkin_step = Some(Box::new(renderer));
        self
    }

    pub fn status_icon(mut self, renderer: impl Renderer<TestStepResultStatus> + 'static) -> Self {
        self.status_icon = Some(Box::new(renderer));
        self
    }

    pub fn examples(mut self, renderer: impl for<'a> Renderer<ExamplesProps<'a>> + 'static) -> Self {
        self.examples = Some(Box::new(renderer));
        self
    }

    pub fn tags(mut self, renderer: impl Renderer<[Tag]> + 'static) -> Self {
        self.tags = Some(Box::new(renderer));
        self
    }

    pub fn description(mut self, renderer: impl Renderer<str> + 'static) -> Self {
        self.description = Some(Box::new(renderer));
        self
    }

    pub fn data_table(mut self, renderer: impl Renderer<DataTable> + 'static) -> Self {
        self.data_table = Some(Box::new(renderer));
        self
    }

    pub fn doc_string(mut self, renderer: impl Renderer<DocString> + 'static) -> Self {
        self.doc_string = Some(Box::new(renderer));
        self
    }

    pub fn error_message(mut self, renderer: impl Renderer<str> + 'static) -> Self {
        self.error_message = Some(Box::new(renderer));
        self
    }

    pub fn attachment(mut self, renderer: impl Renderer<Attachment> + 'static) -> Self {
        self.attachment = Some(Box::new(renderer));
        self
    }

    pub fn hook(mut self, renderer: impl for<'a> Renderer<HookExecution<'a>> + 'static) -> Self {
        self.hook = Some(Box::new(renderer));
        self
    }

    pub fn build(self) -> Components {
        Components {
            gherkin_step: self
                .gherkin_step
                .unwrap_or_else(|| Box::new(defaults::GherkinStep)),
            status_icon: self
                .status_icon
                .unwrap_or_else(|| Box::new(defaults::StatusIcon)),
            examples: self.examples.unwrap_or_else(|| Box::new(defaults::Examples)),
            tags: self.tags.unwrap_or_else(|| Box::new(defaults::Tags)),
            description: self
                .description
                .unwrap_or_else(|| Box::new(defaults::Description)),
            data_table: self
                .data_table
                .unwrap_or_else(|| Box::new(defaults::DataTable)),
            doc_string: self
                .doc_string
                .unwrap_or_else(|| Box::new(defaults::DocString)),
            error_message: self
                .error_message
                .unwrap_or_else(|| Box::new(defaults::ErrorMessage)),
            attachment: self
                .attachment
                .unwrap_or_else(|| Box::new(defaults::Attachment)),
            hook: self.hook.unwrap_or_else(|| Box::new(defaults::Hook)),
        }
    }
}
