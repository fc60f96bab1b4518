//! Event-logic files (`<Screen>.bky`)
//!
//! Blockly XML. A block names the component it acts on in two places:
//!
//! ```xml
//! <block type="component_event">
//!   <mutation component_type="Button" instance_name="Button1" event_name="Click"/>
//!   <field name="COMPONENT_SELECTOR">Button1</field>
//! </block>
//! ```
//!
//! Generic ("any component") blocks carry a type but no instance and are
//! only counted for their type.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const SELECTOR_FIELD: &[u8] = b"COMPONENT_SELECTOR";

/// A component instance used by the event logic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReference {
    pub instance: String,
    pub component_type: Option<String>,
}

/// Everything the event logic says about components
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockUsage {
    /// Instance references in order of first appearance
    pub references: Vec<BlockReference>,
    /// Component types named by any block, generic ones included
    pub component_types: Vec<String>,
}

impl BlockUsage {
    fn reference(&mut self, instance: &str, component_type: Option<String>) {
        if instance.is_empty() {
            return;
        }
        if let Some(kind) = &component_type {
            self.component_type(kind);
        }
        match self.references.iter_mut().find(|r| r.instance == instance) {
            Some(existing) => {
                if existing.component_type.is_none() {
                    existing.component_type = component_type;
                }
            }
            None => self.references.push(BlockReference {
                instance: instance.to_string(),
                component_type,
            }),
        }
    }

    fn component_type(&mut self, kind: &str) {
        if !kind.is_empty() && !self.component_types.iter().any(|t| t == kind) {
            self.component_types.push(kind.to_string());
        }
    }
}

pub fn parse_blocks(xml: &str) -> Result<BlockUsage, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut usage = BlockUsage::default();
    let mut in_selector = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"mutation" => record_mutation(&e, &mut usage)?,
                b"field" => in_selector = is_selector_field(&e)?,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"mutation" => {
                record_mutation(&e, &mut usage)?;
            }
            Event::Text(text) if in_selector => {
                let instance = text.unescape()?;
                usage.reference(instance.trim(), None);
            }
            Event::End(e) if e.name().as_ref() == b"field" => in_selector = false,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(usage)
}

fn record_mutation(element: &BytesStart<'_>, usage: &mut BlockUsage) -> Result<(), quick_xml::Error> {
    let mut component_type = None;
    let mut instance = None;

    for attribute in element.attributes() {
        let attribute = attribute?;
        match attribute.key.as_ref() {
            b"component_type" => component_type = Some(attribute.unescape_value()?.into_owned()),
            b"instance_name" => instance = Some(attribute.unescape_value()?.into_owned()),
            _ => {}
        }
    }

    match (instance, component_type) {
        (Some(instance), component_type) => usage.reference(&instance, component_type),
        (None, Some(component_type)) => usage.component_type(&component_type),
        (None, None) => {}
    }
    Ok(())
}

fn is_selector_field(element: &BytesStart<'_>) -> Result<bool, quick_xml::Error> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.as_ref() == b"name" {
            return Ok(attribute.value.as_ref() == SELECTOR_FIELD);
        }
    }
    Ok(false)
}
