//! 事件子系统（eventing）
//!
//! 提供事件发布/订阅与处理的基础抽象与运行时：
//! - `EventBus`：订阅、退订与发布的统一接口；
//! - `InMemoryEventBus`：进程内总线，按处理器并发扇出并聚合失败；
//! - `EventHandler`：事件处理器协议；
//! - `EventLogger`/`EventMetrics`：内置的审计日志与计数观察者。
//!
//! 总线应在启动时构建一次，并显式注入到需要发布/订阅的组件中。
//!
pub mod bus;
pub mod bus_inmemory;
pub mod handler;
pub mod logger;
pub mod metrics;

pub use bus::EventBus;
pub use bus_inmemory::InMemoryEventBus;
pub use handler::{EventHandler, HandledEventType};
pub use logger::EventLogger;
pub use metrics::EventMetrics;
