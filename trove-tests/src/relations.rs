use crate::model::{DocType, Document, delete_all, doc_type};
use trove::{Connection, Entity, Error, Record};

pub fn relations<C: Connection>(connection: &mut C) {
    delete_all(connection);
    let invoice = doc_type(connection, "Invoice");
    let memo = doc_type(connection, "Memo");
    for title in ["Acme March", "Acme April", "Globex May"] {
        let mut document = Record::<Document>::new(connection).expect("Failed to create a document");
        *document = Document::titled(Some(invoice), title);
        document.save(connection).expect("Failed to save an invoice");
    }
    let mut note = Record::<Document>::new(connection).unwrap();
    *note = Document::titled(Some(memo), "Office closed");
    note.save(connection).expect("Failed to save a memo");

    let kind = DocType::find(connection, &[invoice.into()]).expect("Failed to find the invoice type");
    assert_eq!(kind.name.as_deref(), Some("Invoice"));
    let mut invoices = kind
        .find_many::<Document, _>(connection)
        .expect("Failed to query the invoices");
    let list = invoices.list().expect("Failed to list the invoices");
    assert_eq!(list.len(), 3);
    assert_eq!(list.total(), 3);
    assert!(list.iter().all(|v| v.type_id == Some(invoice)));
    let mut titles = list
        .iter()
        .map(|v| v.title.clone().unwrap_or_default())
        .collect::<Vec<_>>();
    titles.sort();
    assert_eq!(titles, ["Acme April", "Acme March", "Globex May"]);

    let mut acme = kind
        .find_many_where::<Document, _>(connection, "title LIKE ?", &["Acme%".into()])
        .expect("Failed to query the Acme invoices");
    assert_eq!(acme.size().unwrap(), 2);
    assert_eq!(acme.list().unwrap().len(), 2);

    // Removing through the cursor deletes the rows
    let kind = DocType::find(connection, &[memo.into()]).unwrap();
    {
        let mut memos = kind.find_many::<Document, _>(connection).unwrap();
        let mut iter = memos.iter().unwrap();
        assert!(matches!(iter.remove(), Err(Error::Usage(..))));
        while let Some(record) = iter.next() {
            let record = record.expect("Failed to read a memo");
            assert_eq!(record.title.as_deref(), Some("Office closed"));
            assert_eq!(iter.remove().expect("Failed to remove the memo"), 1);
        }
    }
    assert!(Document::find(connection, &note.key_values()).unwrap().is_new());

    // Documents declare no relationship back to their type
    let document = Document::find_first(connection, "", &[]).unwrap();
    assert!(!document.is_new());
    assert!(matches!(
        document.find_many::<DocType, _>(connection),
        Err(Error::Configuration(..))
    ));
}
