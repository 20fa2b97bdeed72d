use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error while writing feed: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML serialization failed: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("tried to close <{found}> while <{expected}> is open")]
    Unbalanced { expected: String, found: String },
    #[error("tried to close <{0}> with no element open")]
    NothingOpen(String),
}

/// Low-level markup output. Implementations guarantee well-formed output only when
/// opens and closes balance; [`MarkupSink::scoped`] guarantees that for its element.
pub trait MarkupSink {
    /// Document prologue, written once before the first element.
    fn begin_document(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn start_element(&mut self, name: &str) -> Result<(), SinkError>;
    fn write_element(&mut self, name: &str, text: &str) -> Result<(), SinkError>;
    fn end_element(&mut self, name: &str) -> Result<(), SinkError>;

    /// Hands everything written so far to the underlying output.
    fn flush(&mut self) -> Result<(), SinkError>;

    /// Opens `name`, runs `body`, and closes `name` on every exit path. An error from
    /// `body` takes precedence over one from the close.
    fn scoped<E, F>(&mut self, name: &str, body: F) -> Result<(), E>
    where
        Self: Sized,
        E: From<SinkError>,
        F: FnOnce(&mut Self) -> Result<(), E>,
    {
        self.start_element(name)?;
        let outcome = body(self);
        let closed = self.end_element(name);
        outcome?;
        closed.map_err(E::from)
    }
}

/// [`MarkupSink`] writing XML to any [`Write`] implementation.
pub struct XmlSink<W: Write> {
    writer: Writer<W>,
    open: Vec<String>,
}

impl<W: Write> XmlSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            open: Vec::new(),
        }
    }

    pub fn pretty(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
            open: Vec::new(),
        }
    }

    /// Elements currently open, outermost first.
    pub fn open_elements(&self) -> &[String] {
        &self.open
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> MarkupSink for XmlSink<W> {
    fn begin_document(&mut self) -> Result<(), SinkError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn start_element(&mut self, name: &str) -> Result<(), SinkError> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        self.open.push(name.to_string());
        Ok(())
    }

    fn write_element(&mut self, name: &str, text: &str) -> Result<(), SinkError> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn end_element(&mut self, name: &str) -> Result<(), SinkError> {
        match self.open.last() {
            None => return Err(SinkError::NothingOpen(name.to_string())),
            Some(current) if current != name => {
                return Err(SinkError::Unbalanced {
                    expected: current.clone(),
                    found: name.to_string(),
                })
            }
            Some(_) => {}
        }
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        self.open.pop();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.get_mut().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(sink: XmlSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).expect("utf8 output")
    }

    #[test]
    fn writes_nested_elements_with_escaped_text() {
        let mut sink = XmlSink::new(Vec::new());
        sink.scoped::<SinkError, _>("category", |sink| {
            sink.write_element("name", "Pots & Pans <new>")
        })
        .expect("write category");

        assert_eq!(
            output(sink),
            "<category><name>Pots &amp; Pans &lt;new&gt;</name></category>"
        );
    }

    #[test]
    fn scoped_closes_element_when_body_fails() {
        let mut sink = XmlSink::new(Vec::new());
        let result = sink.scoped::<SinkError, _>("categories", |sink| {
            sink.write_element("categoryid", "1")?;
            Err(SinkError::NothingOpen("simulated".to_string()))
        });

        assert!(matches!(result, Err(SinkError::NothingOpen(_))));
        assert!(sink.open_elements().is_empty());
        assert_eq!(
            output(sink),
            "<categories><categoryid>1</categoryid></categories>"
        );
    }

    #[test]
    fn mismatched_close_is_reported() {
        let mut sink = XmlSink::new(Vec::new());
        sink.start_element("items").expect("open");
        let err = sink.end_element("item").expect_err("mismatch");
        assert!(matches!(err, SinkError::Unbalanced { .. }));
        assert_eq!(sink.open_elements(), &["items".to_string()]);

        let mut empty = XmlSink::new(Vec::new());
        assert!(matches!(
            empty.end_element("items"),
            Err(SinkError::NothingOpen(_))
        ));
    }

    #[test]
    fn declaration_precedes_content() {
        let mut sink = XmlSink::new(Vec::new());
        sink.begin_document().expect("declaration");
        sink.write_element("feed", "").expect("feed");
        sink.flush().expect("flush");
        assert!(output(sink).starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    }
}
