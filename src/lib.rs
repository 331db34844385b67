mod attrs;
mod entities;
mod ignore;
mod query;
mod scanner;

pub use crate::attrs::{AttrMap, extract_attributes};
pub use crate::ignore::IgnoreRanges;
pub use crate::query::{
    get_element_by_attribute, get_element_by_class, get_element_html_by_attribute,
    get_element_html_by_class, get_element_text_and_html_by_tag, get_elements_by_attribute,
    get_elements_by_class, get_elements_html_by_attribute, get_elements_html_by_class,
    get_elements_text_and_html_by_attribute, get_elements_text_and_html_by_class,
    get_elements_text_and_html_by_tag, try_element_text_and_html_by_tag,
    try_elements_text_and_html_by_tag,
};
pub use crate::scanner::{
    HtmlParseError, OnClose, ParseMode, Tag, TagNode, TagOrder, TagScanner,
};
