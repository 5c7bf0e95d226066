//! Built-in schemas: AMQP 0-9-1 and the Hop message envelope set.

use crate::envelope::{EnvelopeSchema, MessageType};
use crate::schema::{ClassDecl, FieldDecl, MethodDecl, Schema, Version};

pub const CONNECTION: u16 = 10;
pub const CHANNEL: u16 = 20;
pub const EXCHANGE: u16 = 40;
pub const QUEUE: u16 = 50;
pub const BASIC: u16 = 60;
pub const TX: u16 = 90;

fn f(name: &str, domain: &str) -> FieldDecl {
    FieldDecl::new(name, domain)
}

fn reserved(name: &str, domain: &str) -> FieldDecl {
    FieldDecl::reserved(name, domain)
}

/// The AMQP 0-9-1 protocol model.
pub fn amqp0_9_1() -> Schema {
    let schema = Schema::new(Version { major: 0, minor: 9, revision: 1 }, 5672);
    let schema = [
        ("frame-method", 1),
        ("frame-header", 2),
        ("frame-body", 3),
        ("frame-heartbeat", 8),
        ("frame-min-size", 4096),
        ("frame-end", 206),
        ("reply-success", 200),
        ("content-too-large", 311),
        ("no-consumers", 313),
        ("connection-forced", 320),
        ("invalid-path", 402),
        ("access-refused", 403),
        ("not-found", 404),
        ("resource-locked", 405),
        ("precondition-failed", 406),
        ("frame-error", 501),
        ("syntax-error", 502),
        ("command-invalid", 503),
        ("channel-error", 504),
        ("unexpected-frame", 505),
        ("resource-error", 506),
        ("not-allowed", 530),
        ("not-implemented", 540),
        ("internal-error", 541),
    ]
    .into_iter()
    .fold(schema, |s, (name, value)| s.constant(name, value));

    let schema = [
        ("class-id", "short"),
        ("consumer-tag", "shortstr"),
        ("delivery-tag", "longlong"),
        ("exchange-name", "shortstr"),
        ("method-id", "short"),
        ("no-ack", "bit"),
        ("no-local", "bit"),
        ("no-wait", "bit"),
        ("path", "shortstr"),
        ("peer-properties", "table"),
        ("queue-name", "shortstr"),
        ("redelivered", "bit"),
        ("message-count", "long"),
        ("reply-code", "short"),
        ("reply-text", "shortstr"),
        ("bit", "bit"),
        ("octet", "octet"),
        ("short", "short"),
        ("long", "long"),
        ("longlong", "longlong"),
        ("shortstr", "shortstr"),
        ("longstr", "longstr"),
        ("timestamp", "timestamp"),
        ("table", "table"),
    ]
    .into_iter()
    .fold(schema, |s, (name, ty)| s.domain(name, ty));

    schema
        .class(connection())
        .class(channel())
        .class(exchange())
        .class(queue())
        .class(basic())
        .class(tx())
}

fn connection() -> ClassDecl {
    ClassDecl::new(CONNECTION, "connection")
        .method(
            MethodDecl::new(10, "start")
                .response("start-ok")
                .field(f("version-major", "octet"))
                .field(f("version-minor", "octet"))
                .field(f("server-properties", "peer-properties"))
                .field(f("mechanisms", "longstr"))
                .field(f("locales", "longstr")),
        )
        .method(
            MethodDecl::new(11, "start-ok")
                .field(f("client-properties", "peer-properties"))
                .field(f("mechanism", "shortstr"))
                .field(f("response", "longstr"))
                .field(f("locale", "shortstr")),
        )
        .method(MethodDecl::new(20, "secure").response("secure-ok").field(f("challenge", "longstr")))
        .method(MethodDecl::new(21, "secure-ok").field(f("response", "longstr")))
        .method(
            MethodDecl::new(30, "tune")
                .response("tune-ok")
                .field(f("channel-max", "short"))
                .field(f("frame-max", "long"))
                .field(f("heartbeat", "short")),
        )
        .method(
            MethodDecl::new(31, "tune-ok")
                .field(f("channel-max", "short"))
                .field(f("frame-max", "long"))
                .field(f("heartbeat", "short")),
        )
        .method(
            MethodDecl::new(40, "open")
                .response("open-ok")
                .field(f("virtual-host", "path"))
                .field(reserved("reserved-1", "shortstr"))
                .field(reserved("reserved-2", "bit")),
        )
        .method(MethodDecl::new(41, "open-ok").field(reserved("reserved-1", "shortstr")))
        .method(
            MethodDecl::new(50, "close")
                .response("close-ok")
                .field(f("reply-code", "reply-code"))
                .field(f("reply-text", "reply-text"))
                .field(f("class-id", "class-id"))
                .field(f("method-id", "method-id")),
        )
        .method(MethodDecl::new(51, "close-ok"))
}

fn channel() -> ClassDecl {
    ClassDecl::new(CHANNEL, "channel")
        .method(MethodDecl::new(10, "open").response("open-ok").field(reserved("reserved-1", "shortstr")))
        .method(MethodDecl::new(11, "open-ok").field(reserved("reserved-1", "longstr")))
        .method(MethodDecl::new(20, "flow").response("flow-ok").field(f("active", "bit")))
        .method(MethodDecl::new(21, "flow-ok").synchronous(false).field(f("active", "bit")))
        .method(
            MethodDecl::new(40, "close")
                .response("close-ok")
                .field(f("reply-code", "reply-code"))
                .field(f("reply-text", "reply-text"))
                .field(f("class-id", "class-id"))
                .field(f("method-id", "method-id")),
        )
        .method(MethodDecl::new(41, "close-ok"))
}

fn exchange() -> ClassDecl {
    ClassDecl::new(EXCHANGE, "exchange")
        .method(
            MethodDecl::new(10, "declare")
                .response("declare-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("exchange", "exchange-name"))
                .field(f("type", "shortstr"))
                .field(f("passive", "bit"))
                .field(f("durable", "bit"))
                .field(reserved("reserved-2", "bit"))
                .field(reserved("reserved-3", "bit"))
                .field(f("no-wait", "no-wait"))
                .field(f("arguments", "table")),
        )
        .method(MethodDecl::new(11, "declare-ok"))
        .method(
            MethodDecl::new(20, "delete")
                .response("delete-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("exchange", "exchange-name"))
                .field(f("if-unused", "bit"))
                .field(f("no-wait", "no-wait")),
        )
        .method(MethodDecl::new(21, "delete-ok"))
}

fn queue() -> ClassDecl {
    ClassDecl::new(QUEUE, "queue")
        .method(
            MethodDecl::new(10, "declare")
                .response("declare-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("queue", "queue-name"))
                .field(f("passive", "bit"))
                .field(f("durable", "bit"))
                .field(f("exclusive", "bit"))
                .field(f("auto-delete", "bit"))
                .field(f("no-wait", "no-wait"))
                .field(f("arguments", "table")),
        )
        .method(
            MethodDecl::new(11, "declare-ok")
                .field(f("queue", "queue-name"))
                .field(f("message-count", "message-count"))
                .field(f("consumer-count", "long")),
        )
        .method(
            MethodDecl::new(20, "bind")
                .response("bind-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("queue", "queue-name"))
                .field(f("exchange", "exchange-name"))
                .field(f("routing-key", "shortstr"))
                .field(f("no-wait", "no-wait"))
                .field(f("arguments", "table")),
        )
        .method(MethodDecl::new(21, "bind-ok"))
        .method(
            MethodDecl::new(50, "unbind")
                .response("unbind-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("queue", "queue-name"))
                .field(f("exchange", "exchange-name"))
                .field(f("routing-key", "shortstr"))
                .field(f("arguments", "table")),
        )
        .method(MethodDecl::new(51, "unbind-ok"))
        .method(
            MethodDecl::new(30, "purge")
                .response("purge-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("queue", "queue-name"))
                .field(f("no-wait", "no-wait")),
        )
        .method(MethodDecl::new(31, "purge-ok").field(f("message-count", "message-count")))
        .method(
            MethodDecl::new(40, "delete")
                .response("delete-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("queue", "queue-name"))
                .field(f("if-unused", "bit"))
                .field(f("if-empty", "bit"))
                .field(f("no-wait", "no-wait")),
        )
        .method(MethodDecl::new(41, "delete-ok").field(f("message-count", "message-count")))
}

fn basic() -> ClassDecl {
    ClassDecl::new(BASIC, "basic")
        .field(f("content-type", "shortstr"))
        .field(f("content-encoding", "shortstr"))
        .field(f("headers", "table"))
        .field(f("delivery-mode", "octet"))
        .field(f("priority", "octet"))
        .field(f("correlation-id", "shortstr"))
        .field(f("reply-to", "shortstr"))
        .field(f("expiration", "shortstr"))
        .field(f("message-id", "shortstr"))
        .field(f("timestamp", "timestamp"))
        .field(f("type", "shortstr"))
        .field(f("user-id", "shortstr"))
        .field(f("app-id", "shortstr"))
        .field(reserved("reserved", "shortstr"))
        .method(
            MethodDecl::new(10, "qos")
                .response("qos-ok")
                .field(f("prefetch-size", "long"))
                .field(f("prefetch-count", "short"))
                .field(f("global", "bit")),
        )
        .method(MethodDecl::new(11, "qos-ok"))
        .method(
            MethodDecl::new(20, "consume")
                .response("consume-ok")
                .field(reserved("reserved-1", "short"))
                .field(f("queue", "queue-name"))
                .field(f("consumer-tag", "consumer-tag"))
                .field(f("no-local", "no-local"))
                .field(f("no-ack", "no-ack"))
                .field(f("exclusive", "bit"))
                .field(f("no-wait", "no-wait"))
                .field(f("arguments", "table")),
        )
        .method(MethodDecl::new(21, "consume-ok").field(f("consumer-tag", "consumer-tag")))
        .method(
            MethodDecl::new(30, "cancel")
                .response("cancel-ok")
                .field(f("consumer-tag", "consumer-tag"))
                .field(f("no-wait", "no-wait")),
        )
        .method(MethodDecl::new(31, "cancel-ok").field(f("consumer-tag", "consumer-tag")))
        .method(
            MethodDecl::new(40, "publish")
                .content()
                .synchronous(false)
                .field(reserved("reserved-1", "short"))
                .field(f("exchange", "exchange-name"))
                .field(f("routing-key", "shortstr"))
                .field(f("mandatory", "bit"))
                .field(f("immediate", "bit")),
        )
        .method(
            MethodDecl::new(50, "return")
                .content()
                .synchronous(false)
                .field(f("reply-code", "reply-code"))
                .field(f("reply-text", "reply-text"))
                .field(f("exchange", "exchange-name"))
                .field(f("routing-key", "shortstr")),
        )
        .method(
            MethodDecl::new(60, "deliver")
                .content()
                .synchronous(false)
                .field(f("consumer-tag", "consumer-tag"))
                .field(f("delivery-tag", "delivery-tag"))
                .field(f("redelivered", "redelivered"))
                .field(f("exchange", "exchange-name"))
                .field(f("routing-key", "shortstr")),
        )
        .method(
            MethodDecl::new(70, "get")
                .response("get-ok")
                .response("get-empty")
                .field(reserved("reserved-1", "short"))
                .field(f("queue", "queue-name"))
                .field(f("no-ack", "no-ack")),
        )
        .method(
            MethodDecl::new(71, "get-ok")
                .content()
                .field(f("delivery-tag", "delivery-tag"))
                .field(f("redelivered", "redelivered"))
                .field(f("exchange", "exchange-name"))
                .field(f("routing-key", "shortstr"))
                .field(f("message-count", "message-count")),
        )
        .method(MethodDecl::new(72, "get-empty").field(reserved("reserved-1", "shortstr")))
        .method(
            MethodDecl::new(80, "ack")
                .synchronous(false)
                .field(f("delivery-tag", "delivery-tag"))
                .field(f("multiple", "bit")),
        )
        .method(
            MethodDecl::new(90, "reject")
                .synchronous(false)
                .field(f("delivery-tag", "delivery-tag"))
                .field(f("requeue", "bit")),
        )
        .method(
            MethodDecl::new(100, "recover-async")
                .deprecated()
                .synchronous(false)
                .field(f("requeue", "bit")),
        )
        .method(MethodDecl::new(110, "recover").response("recover-ok").field(f("requeue", "bit")))
        .method(MethodDecl::new(111, "recover-ok"))
}

fn tx() -> ClassDecl {
    ClassDecl::new(TX, "tx")
        .method(MethodDecl::new(10, "select").response("select-ok"))
        .method(MethodDecl::new(11, "select-ok"))
        .method(MethodDecl::new(20, "commit").response("commit-ok"))
        .method(MethodDecl::new(21, "commit-ok"))
        .method(MethodDecl::new(30, "rollback").response("rollback-ok"))
        .method(MethodDecl::new(31, "rollback-ok"))
}

/// Messages exchanged between Hop nodes.
pub fn hop_messages() -> EnvelopeSchema {
    EnvelopeSchema::new(vec![
        MessageType::new("post", &["target", "datum", "token"]),
        MessageType::new("subscribe", &["filter", "sink", "name", "reply_sink", "reply_name"]),
        MessageType::new("unsubscribe", &["token"]),
        MessageType::new("create", &["classname", "arg", "reply_sink", "reply_name"]),
    ])
}
